pub mod keywords;

pub use keywords::{Keyword, KeywordBuilder, KeywordLookup, KeywordValue};
