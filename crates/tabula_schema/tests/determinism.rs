//! The schema hash must depend only on the loaded model, never on the
//! formatting of the input document.

use proptest::prelude::*;
use tabula_schema::{generate, load_schema};

const COMPACT: &str = "table a { id uuid @id\nname text @unique }";

fn padding() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec![" ", "  ", "\t", "\n", "\n\n", " # note\n"]),
        0..4,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn hash_is_stable_under_reformatting(pads in prop::collection::vec(padding(), 6)) {
        let padded = format!(
            "{}table a {}{{ {}id uuid @id{}\nname text @unique {}}}{}",
            pads[0], pads[1], pads[2], pads[3], pads[4], pads[5]
        );

        let baseline = generate(&load_schema(COMPACT).unwrap()).unwrap();
        let reformatted = generate(&load_schema(&padded).unwrap()).unwrap();

        prop_assert_eq!(baseline.ddl, reformatted.ddl);
        prop_assert_eq!(baseline.hash, reformatted.hash);
    }
}
