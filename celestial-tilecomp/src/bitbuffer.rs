//! MSB-first bit packing shared by the Rice and HCOMPRESS codecs.

use crate::core::{CompressionError, Result};

const MASK: [u32; 33] = [
    0, 0x1, 0x3, 0x7, 0xf, 0x1f, 0x3f, 0x7f, 0xff, 0x1ff, 0x3ff, 0x7ff, 0xfff, 0x1fff, 0x3fff,
    0x7fff, 0xffff, 0x1ffff, 0x3ffff, 0x7ffff, 0xfffff, 0x1fffff, 0x3fffff, 0x7fffff, 0xffffff,
    0x1ffffff, 0x3ffffff, 0x7ffffff, 0xfffffff, 0x1fffffff, 0x3fffffff, 0x7fffffff, 0xffffffff,
];

pub struct BitWriter {
    buffer: Vec<u8>,
    bit_buffer: u32,
    bits_to_go: u8,
}

impl BitWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            bit_buffer: 0,
            bits_to_go: 8,
        }
    }

    /// Append the low `n` bits of `bits`, most significant first.
    pub fn output_nbits(&mut self, bits: u32, n: usize) -> Result<()> {
        if n > 32 {
            return Err(CompressionError::params(
                "cannot output more than 32 bits at once",
            ));
        }

        // At most seven bits are pending, so a single shift holds 24 new ones.
        if n > 24 {
            self.output_nbits(bits >> 24, n - 24)?;
            return self.output_nbits(bits & MASK[24], 24);
        }

        let mut local_bit_buffer = self.bit_buffer;
        let mut local_bits_to_go = self.bits_to_go as i8;
        let remaining_bits = n as i8;

        local_bit_buffer <<= remaining_bits;
        local_bit_buffer |= bits & MASK[remaining_bits as usize];
        local_bits_to_go -= remaining_bits;

        while local_bits_to_go <= 0 {
            self.buffer
                .push(((local_bit_buffer >> (-local_bits_to_go)) & 0xff) as u8);
            local_bits_to_go += 8;
        }

        self.bit_buffer = local_bit_buffer;
        self.bits_to_go = local_bits_to_go as u8;

        Ok(())
    }

    /// Append `n` zero bits followed by a single one bit.
    pub fn output_unary(&mut self, n: usize) -> Result<()> {
        let mut zeros = n;
        while zeros >= 32 {
            self.output_nbits(0, 32)?;
            zeros -= 32;
        }
        self.output_nbits(1, zeros + 1)
    }

    pub fn output_nybble(&mut self, nybble: u8) -> Result<()> {
        self.output_nbits(u32::from(nybble & 0x0f), 4)
    }

    pub fn flush(&mut self) {
        if self.bits_to_go < 8 {
            self.buffer.push((self.bit_buffer << self.bits_to_go) as u8);
            self.bit_buffer = 0;
            self.bits_to_go = 8;
        }
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.flush();
        self.buffer
    }
}

pub struct BitReader<'a> {
    data: &'a [u8],
    position: usize,
    bit_buffer: u32,
    bits_remaining: u8,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        let mut reader = Self {
            data,
            position: 0,
            bit_buffer: 0,
            bits_remaining: 0,
        };

        if !data.is_empty() {
            reader.bit_buffer = data[0] as u32;
            reader.position = 1;
            reader.bits_remaining = 8;
        }

        reader
    }

    pub fn read_bits(&mut self, n: usize) -> Result<u32> {
        if n > 32 {
            return Err(CompressionError::params(
                "cannot read more than 32 bits at once",
            ));
        }

        if n == 0 {
            return Ok(0);
        }

        if n > 24 {
            return self.read_bits_incremental(n);
        }

        while self.bits_remaining < n as u8 {
            self.load_byte()?;
        }

        let mask = (1u32 << n) - 1;
        self.bits_remaining -= n as u8;
        let result = (self.bit_buffer >> self.bits_remaining) & mask;
        self.bit_buffer &= (1 << self.bits_remaining) - 1;

        Ok(result)
    }

    fn read_bits_incremental(&mut self, n: usize) -> Result<u32> {
        let mut result = 0u32;
        let mut bits_needed = n;

        while bits_needed > 0 {
            let chunk_size = bits_needed.min(8);
            let bits = self.read_bits(chunk_size)?;
            result = (result << chunk_size) | bits;
            bits_needed -= chunk_size;
        }

        Ok(result)
    }

    fn load_byte(&mut self) -> Result<()> {
        let byte = self
            .data
            .get(self.position)
            .ok_or_else(|| CompressionError::corrupt("unexpected end of compressed data"))?;
        self.bit_buffer = (self.bit_buffer << 8) | u32::from(*byte);
        self.position += 1;
        self.bits_remaining += 8;
        Ok(())
    }

    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    pub fn read_nybble(&mut self) -> Result<u8> {
        Ok(self.read_bits(4)? as u8)
    }

    /// Drop any buffered bits so the next read starts at a byte boundary.
    pub fn align_to_byte(&mut self) {
        self.bit_buffer = 0;
        self.bits_remaining = 0;
    }

    pub fn count_leading_zeros(&mut self) -> Result<usize> {
        let mut count = 0;

        while self.read_bits(1)? == 0 {
            count += 1;
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_writer() {
        let mut writer = BitWriter::with_capacity(10);
        assert!(writer.output_nbits(0b1010, 4).is_ok());
        let result = writer.finish();
        assert_eq!(result[0], 0b10100000);
    }

    #[test]
    fn test_bit_writer_multiple_writes() {
        let mut writer = BitWriter::with_capacity(10);
        assert!(writer.output_nbits(0b1010, 4).is_ok());
        assert!(writer.output_nbits(0b1100, 4).is_ok());
        assert!(writer.output_nbits(0b1, 1).is_ok());
        let result = writer.finish();
        assert_eq!(result, vec![0b10101100, 0b10000000]);
    }

    #[test]
    fn test_bit_writer_full_word() {
        let mut writer = BitWriter::with_capacity(10);
        writer.output_nbits(0b101, 3).unwrap();
        writer.output_nbits(0xDEADBEEF, 32).unwrap();
        let result = writer.finish();

        let mut reader = BitReader::new(&result);
        assert_eq!(reader.read_bits(3).unwrap(), 0b101);
        assert_eq!(reader.read_bits(32).unwrap(), 0xDEADBEEF);
    }

    #[test]
    fn test_long_unary_after_partial_byte() {
        for pending in 1..8 {
            for zeros in 24..34 {
                let mut writer = BitWriter::with_capacity(16);
                writer.output_nbits(0x55, pending).unwrap();
                writer.output_unary(zeros).unwrap();
                writer.output_nbits(0b10_1101, 6).unwrap();
                let result = writer.finish();

                let mut reader = BitReader::new(&result);
                assert_eq!(reader.read_bits(pending).unwrap(), 0x55 & MASK[pending]);
                assert_eq!(reader.count_leading_zeros().unwrap(), zeros, "{} {}", pending, zeros);
                assert_eq!(reader.read_bits(6).unwrap(), 0b10_1101);
            }
        }
    }

    #[test]
    fn test_wide_writes_at_every_offset() {
        for pending in 0..8 {
            for n in 25..=32 {
                let value = 0xF0E1_D2C3u32 & MASK[n];
                let mut writer = BitWriter::with_capacity(8);
                writer.output_nbits(0x7F, pending).unwrap();
                writer.output_nbits(value, n).unwrap();
                let result = writer.finish();

                let mut reader = BitReader::new(&result);
                assert_eq!(reader.read_bits(pending).unwrap(), 0x7F & MASK[pending]);
                assert_eq!(reader.read_bits(n).unwrap(), value, "{} {}", pending, n);
            }
        }
    }

    #[test]
    fn test_bit_writer_rejects_wide_writes() {
        let mut writer = BitWriter::with_capacity(10);
        assert!(writer.output_nbits(0, 33).is_err());
    }

    #[test]
    fn test_output_unary_longer_than_word() {
        let mut writer = BitWriter::with_capacity(16);
        writer.output_unary(40).unwrap();
        let result = writer.finish();

        let mut reader = BitReader::new(&result);
        assert_eq!(reader.count_leading_zeros().unwrap(), 40);
    }

    #[test]
    fn test_nybbles_and_alignment() {
        let mut writer = BitWriter::with_capacity(4);
        writer.output_nybble(0xF).unwrap();
        writer.output_nbits(0b01, 2).unwrap();
        writer.flush();
        writer.output_nbits(0xA5, 8).unwrap();
        let result = writer.finish();
        assert_eq!(result, vec![0b1111_0100, 0xA5]);

        let mut reader = BitReader::new(&result);
        assert_eq!(reader.read_nybble().unwrap(), 0xF);
        assert!(!reader.read_bit().unwrap());
        reader.align_to_byte();
        assert_eq!(reader.read_bits(8).unwrap(), 0xA5);
    }

    #[test]
    fn test_bit_reader_end_of_data() {
        let data = [0xFFu8];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(8).unwrap(), 0xFF);
        assert!(matches!(
            reader.read_bits(1),
            Err(CompressionError::CorruptStream(_))
        ));
    }

    #[test]
    fn test_bit_reader_empty() {
        let mut reader = BitReader::new(&[]);
        assert!(reader.read_bits(1).is_err());
        assert_eq!(reader.read_bits(0).unwrap(), 0);
    }
}
