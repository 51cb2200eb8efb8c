use gridcalc_core::{AddressTranslator, RangeAddress, RangeAddressFactory, MAX_COLS, MAX_ROWS};
use proptest::prelude::*;

proptest! {
    #[test]
    fn address_text_translates_back(col in 1..=MAX_COLS, row in 1..=MAX_ROWS) {
        let text = AddressTranslator::to_address(col, row).unwrap();
        prop_assert_eq!(AddressTranslator::to_col_and_row(&text).unwrap(), (col, row));
    }

    #[test]
    fn collision_is_symmetric(
        a in (1u32..50, 1u32..50, 1u32..50, 1u32..50),
        b in (1u32..50, 1u32..50, 1u32..50, 1u32..50),
    ) {
        let ra = RangeAddress::new(Some("S".into()), a.0, a.1, a.2, a.3);
        let rb = RangeAddress::new(Some("S".into()), b.0, b.1, b.2, b.3);
        prop_assert_eq!(ra.collides_with(&rb), rb.collides_with(&ra));
        prop_assert_eq!(ra.collides_with(&rb), ra.intersect(&rb).is_some());
    }
}

#[test]
fn parses_displayed_ranges() {
    let factory = RangeAddressFactory::default();
    for text in ["Sheet1!A1:C3", "'My Sheet'!B15", "Data!XFD1048576"] {
        let range = factory.parse(text, None).unwrap();
        assert_eq!(range.to_string(), text);
    }
}
