use bech32::u5;

/// Packs big-endian bit strings of arbitrary width into 5-bit groups.
///
/// The writer tracks its position in bits, so fields that do not end on a group
/// boundary (the 35-bit timestamp, 8-bit bytes) can be appended back to back.
#[derive(Debug, Default)]
pub(crate) struct U5Writer {
    groups: Vec<u5>,
    /// Bits of the group under construction, right aligned.
    buffer: u8,
    /// Number of valid bits in `buffer`, always below 5.
    buffer_bits: u8,
}

impl U5Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bit_len(&self) -> usize {
        self.groups.len() * 5 + self.buffer_bits as usize
    }

    fn push_bit(&mut self, bit: bool) {
        self.buffer = (self.buffer << 1) | bit as u8;
        self.buffer_bits += 1;
        if self.buffer_bits == 5 {
            self.groups
                .push(u5::try_from_u8(self.buffer).expect("<32"));
            self.buffer = 0;
            self.buffer_bits = 0;
        }
    }

    /// Appends the low `width` bits of `value`, most significant bit first.
    pub fn write_bits(&mut self, value: u64, width: u8) {
        debug_assert!(width <= 64);
        for shift in (0..width).rev() {
            self.push_bit((value >> shift) & 1 == 1);
        }
    }

    pub fn write_u5(&mut self, group: u5) {
        self.write_bits(group.to_u8() as u64, 5);
    }

    pub fn write_u5_slice(&mut self, groups: &[u5]) {
        if self.buffer_bits == 0 {
            self.groups.extend_from_slice(groups);
        } else {
            for group in groups {
                self.write_u5(*group);
            }
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.write_bits(*byte as u64, 8);
        }
    }

    /// Zero-fills the group under construction, if any.
    pub fn pad_to_group(&mut self) {
        while self.buffer_bits != 0 {
            self.push_bit(false);
        }
    }

    pub fn finish(mut self) -> Vec<u5> {
        self.pad_to_group();
        self.groups
    }
}

/// Bit cursor over a slice of 5-bit groups.
#[derive(Debug, Clone)]
pub(crate) struct U5Reader<'a> {
    data: &'a [u5],
    bit_pos: usize,
}

impl<'a> U5Reader<'a> {
    pub fn new(data: &'a [u5]) -> Self {
        Self { data, bit_pos: 0 }
    }

    /// Index of the group the cursor is in.
    pub fn group_pos(&self) -> usize {
        self.bit_pos / 5
    }

    pub fn remaining_bits(&self) -> usize {
        self.data.len() * 5 - self.bit_pos
    }

    pub fn remaining_groups(&self) -> usize {
        self.remaining_bits() / 5
    }

    pub fn is_empty(&self) -> bool {
        self.remaining_bits() == 0
    }

    /// Reads `width` bits as a big-endian integer.
    pub fn read_bits(&mut self, width: u8) -> Option<u64> {
        if width > 64 || self.remaining_bits() < width as usize {
            return None;
        }
        let mut value = 0u64;
        for _ in 0..width {
            let group = self.data[self.bit_pos / 5].to_u8();
            let bit = (group >> (4 - self.bit_pos % 5)) & 1;
            value = (value << 1) | bit as u64;
            self.bit_pos += 1;
        }
        Some(value)
    }

    /// Takes the next `count` whole groups. The cursor must sit on a group boundary.
    pub fn read_groups(&mut self, count: usize) -> Option<&'a [u5]> {
        if self.bit_pos % 5 != 0 || self.remaining_groups() < count {
            return None;
        }
        let start = self.bit_pos / 5;
        self.bit_pos += count * 5;
        Some(&self.data[start..start + count])
    }
}

/// Minimal big-endian base-32 digits of `value`; zero has no digits.
pub(crate) fn encode_int_be_base32(value: u64) -> Vec<u5> {
    let significant_bits = 64 - value.leading_zeros() as usize;
    let groups = significant_bits.div_ceil(5);
    let mut writer = U5Writer::new();
    writer.write_bits(0, (groups * 5 - significant_bits) as u8);
    writer.write_bits(value, significant_bits as u8);
    writer.finish()
}

pub(crate) fn parse_int_be_base32(digits: &[u5]) -> Option<u64> {
    digits.iter().try_fold(0u64, |acc, digit| {
        acc.checked_mul(32)?.checked_add(digit.to_u8() as u64)
    })
}
