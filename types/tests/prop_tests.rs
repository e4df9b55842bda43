use proptest::prelude::*;

use dao_types::{BsqAmount, Digest, NetworkId, Param, Phase, Timestamp, TxId, TxOutputKey};

proptest! {
    /// TxId hex display parses back to the same id.
    #[test]
    fn tx_id_hex_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let id = TxId::new(bytes);
        let parsed: TxId = id.to_string().parse().unwrap();
        prop_assert_eq!(parsed, id);
    }

    /// TxId ordering agrees with byte-array ordering.
    #[test]
    fn tx_id_order_matches_bytes(
        a in prop::array::uniform32(0u8..),
        b in prop::array::uniform32(0u8..),
    ) {
        prop_assert_eq!(TxId::new(a).cmp(&TxId::new(b)), a.cmp(&b));
    }

    /// Output keys sort by tx id first, then by index.
    #[test]
    fn output_key_ordering(
        a in prop::array::uniform32(0u8..),
        i in 0u32..100,
        j in 0u32..100,
    ) {
        let ka = TxOutputKey::new(TxId::new(a), i);
        let kb = TxOutputKey::new(TxId::new(a), j);
        prop_assert_eq!(ka.cmp(&kb), i.cmp(&j));
    }

    /// Digest bincode encoding is exactly the 20 raw bytes.
    #[test]
    fn digest_bincode_is_fixed_width(bytes in prop::array::uniform20(0u8..)) {
        let digest = Digest::new(bytes);
        let encoded = bincode::serialize(&digest).unwrap();
        prop_assert_eq!(encoded.len(), Digest::LEN);
        let decoded: Digest = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, digest);
    }

    /// Timestamp elapsed_since saturates when `now` precedes the timestamp.
    #[test]
    fn timestamp_elapsed_since(base in 0u64..1_000_000, offset in 0u64..1_000_000) {
        let t = Timestamp::new(base + offset);
        prop_assert_eq!(t.elapsed_since(Timestamp::new(base)), 0);
        prop_assert_eq!(Timestamp::new(base).elapsed_since(t), offset);
    }

    /// checked_sub returns None exactly when the subtrahend is larger.
    #[test]
    fn bsq_checked_sub(a in 0u64..1_000_000, b in 0u64..1_000_000) {
        let result = BsqAmount::new(a).checked_sub(BsqAmount::new(b));
        if b > a {
            prop_assert!(result.is_none());
        } else {
            prop_assert_eq!(result, Some(BsqAmount::new(a - b)));
        }
    }

    /// Display always shows two decimals and the integer part.
    #[test]
    fn bsq_display(sats in 0u64..10_000_000_000) {
        let shown = BsqAmount::new(sats).to_string();
        let expected = format!("{}.{:02} BSQ", sats / 100, sats % 100);
        prop_assert_eq!(shown, expected);
    }
}

#[test]
fn phase_order_is_cycle_order() {
    let mut sorted = Phase::ALL;
    sorted.sort();
    assert_eq!(sorted, Phase::ALL);
    assert_eq!(Phase::ALL.first(), Some(&Phase::Undefined));
    assert_eq!(Phase::ALL.last(), Some(&Phase::Break4));
}

#[test]
fn regtest_durations_are_short() {
    let total: u64 = Phase::ALL
        .iter()
        .map(|p| Param::for_phase(*p).default_value(NetworkId::Regtest))
        .sum();
    assert_eq!(total, 14);
}
