use std::collections::HashMap;

use super::codecs::{GzipCodec, HcompressCodec, PlioCodec, RiceCodec, ShuffledGzipCodec};
use super::{ParamKind, ParamSpec, Parameters, Requirement, TileCodec};
use crate::core::{CompressionError, Result};

/// Builds a codec from an already validated parameter bag.
pub type CodecFactory = Box<dyn Fn(&Parameters) -> Result<Box<dyn TileCodec>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Compress,
    Decompress,
}

/// The parameters an algorithm accepts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodecSchema {
    pub params: Vec<ParamSpec>,
}

impl CodecSchema {
    pub fn new(params: impl IntoIterator<Item = ParamSpec>) -> Self {
        Self {
            params: params.into_iter().collect(),
        }
    }

    pub fn validate(&self, algorithm: &str, params: &Parameters, direction: Direction) -> Result<()> {
        if let Some(unknown) = params
            .names()
            .find(|name| !self.params.iter().any(|spec| spec.name == *name))
        {
            return Err(CompressionError::params(format!(
                "{} does not accept parameter {}",
                algorithm, unknown
            )));
        }

        for spec in &self.params {
            let required = match spec.requirement {
                Requirement::Always => true,
                Requirement::Decompress => direction == Direction::Decompress,
                Requirement::Optional => false,
            };
            if required && !params.contains(spec.name) {
                return Err(CompressionError::params(format!(
                    "{} requires parameter {}",
                    algorithm, spec.name
                )));
            }
            spec.check_type(params)?;
        }
        Ok(())
    }
}

struct Entry {
    schema: CodecSchema,
    factory: CodecFactory,
}

/// Algorithm names mapped to their schema and codec factory.
#[derive(Default)]
pub struct CodecRegistry {
    entries: HashMap<String, Entry>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The five FITS algorithms, plus the `RICE_ONE` alias.
    pub fn with_fits_codecs() -> Self {
        use ParamKind::{Integer, Logical};

        let mut registry = Self::new();
        registry.register("GZIP_1", CodecSchema::default(), |p| {
            Ok(Box::new(GzipCodec::from_params(p)?))
        });
        registry.register(
            "GZIP_2",
            CodecSchema::new([ParamSpec::required("itemsize", Integer)]),
            |p| Ok(Box::new(ShuffledGzipCodec::from_params(p)?)),
        );

        let rice = CodecSchema::new([
            ParamSpec::optional("blocksize", Integer),
            ParamSpec::optional("bytepix", Integer),
            ParamSpec::for_decompress("tilesize", Integer),
        ]);
        registry.register("RICE_1", rice.clone(), |p| {
            Ok(Box::new(RiceCodec::from_params(p)?))
        });
        registry.register("RICE_ONE", rice, |p| Ok(Box::new(RiceCodec::from_params(p)?)));

        registry.register(
            "PLIO_1",
            CodecSchema::new([
                ParamSpec::for_decompress("tilesize", Integer),
                ParamSpec::optional("bytepix", Integer),
            ]),
            |p| Ok(Box::new(PlioCodec::from_params(p)?)),
        );
        registry.register(
            "HCOMPRESS_1",
            CodecSchema::new([
                ParamSpec::optional("scale", Integer),
                ParamSpec::optional("smooth", Logical),
                ParamSpec::required("nx", Integer),
                ParamSpec::required("ny", Integer),
                ParamSpec::optional("bytepix", Integer),
            ]),
            |p| Ok(Box::new(HcompressCodec::from_params(p)?)),
        );
        registry
    }

    /// Add or replace an algorithm.
    pub fn register<S, F>(&mut self, name: S, schema: CodecSchema, factory: F)
    where
        S: Into<String>,
        F: Fn(&Parameters) -> Result<Box<dyn TileCodec>> + Send + Sync + 'static,
    {
        self.entries.insert(
            name.into(),
            Entry {
                schema,
                factory: Box::new(factory),
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn schema(&self, name: &str) -> Result<&CodecSchema> {
        self.entry(name).map(|e| &e.schema)
    }

    fn entry(&self, name: &str) -> Result<&Entry> {
        self.entries
            .get(name)
            .ok_or_else(|| CompressionError::UnknownAlgorithm(name.to_string()))
    }

    /// Validate `params` against the algorithm's schema and bind a codec.
    pub fn codec(
        &self,
        name: &str,
        params: &Parameters,
        direction: Direction,
    ) -> Result<Box<dyn TileCodec>> {
        let entry = self.entry(name)?;
        entry.schema.validate(name, params, direction)?;
        (entry.factory)(params)
    }
}
