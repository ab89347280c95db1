use std::sync::OnceLock;

use crate::inflate::inftrees::{inflate_table, CodeType, InflateTable};
use crate::Code;

/// Decode tables for the fixed literal/length and distance codes of RFC 1951
/// section 3.2.6, built once on first use.
pub(crate) struct FixedTables {
    pub(crate) lenfix: [Code; 512],
    pub(crate) distfix: [Code; 32],
}

pub(crate) fn fixed_tables() -> &'static FixedTables {
    static TABLES: OnceLock<FixedTables> = OnceLock::new();
    TABLES.get_or_init(build_fixed_tables)
}

fn build_fixed_tables() -> FixedTables {
    let mut lens = [0u16; 320];
    let mut work = [0u16; 288];

    for (sym, len) in lens[..288].iter_mut().enumerate() {
        *len = match sym {
            0..=143 => 8,
            144..=255 => 9,
            256..=279 => 7,
            _ => 8,
        };
    }

    let mut lenfix = [Code::default(); 512];
    let result = inflate_table(CodeType::Lens, &lens, 288, &mut lenfix, 9, &mut work);
    debug_assert_eq!(result, InflateTable::Success(9));

    for len in lens[..32].iter_mut() {
        *len = 5;
    }

    let mut distfix = [Code::default(); 32];
    let result = inflate_table(CodeType::Dists, &lens, 32, &mut distfix, 5, &mut work);
    debug_assert_eq!(result, InflateTable::Success(5));

    FixedTables { lenfix, distfix }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_literal_table_spot_checks() {
        let tables = fixed_tables();

        // 7-bit code 0000000 is the end-of-block symbol
        assert_eq!(tables.lenfix[0].op, 96);
        assert_eq!(tables.lenfix[0].bits, 7);

        // 8-bit code 00110000 (reversed 00001100) is literal 0
        assert_eq!(tables.lenfix[0b0000_1100].op, 0);
        assert_eq!(tables.lenfix[0b0000_1100].val, 0);

        // every distance entry resolves in 5 bits
        for code in tables.distfix.iter() {
            assert_eq!(code.bits, 5);
        }
    }
}
