//! Property tests for ByteView primitive round trips

use proptest::prelude::*;
use sbe_otf::ir::ByteOrder;
use sbe_otf::{ByteView, PrimitiveType, PrimitiveValue};

fn byte_order() -> impl Strategy<Value = ByteOrder> {
    prop_oneof![Just(ByteOrder::LittleEndian), Just(ByteOrder::BigEndian)]
}

fn value_for(ty: PrimitiveType) -> BoxedStrategy<PrimitiveValue> {
    match ty {
        PrimitiveType::Char => any::<u8>().prop_map(PrimitiveValue::Char).boxed(),
        PrimitiveType::Int8 => any::<i8>().prop_map(|v| PrimitiveValue::Int(v as i64)).boxed(),
        PrimitiveType::Int16 => any::<i16>().prop_map(|v| PrimitiveValue::Int(v as i64)).boxed(),
        PrimitiveType::Int32 => any::<i32>().prop_map(|v| PrimitiveValue::Int(v as i64)).boxed(),
        PrimitiveType::Int64 => any::<i64>().prop_map(PrimitiveValue::Int).boxed(),
        PrimitiveType::UInt8 => any::<u8>().prop_map(|v| PrimitiveValue::UInt(v as u64)).boxed(),
        PrimitiveType::UInt16 => any::<u16>().prop_map(|v| PrimitiveValue::UInt(v as u64)).boxed(),
        PrimitiveType::UInt32 => any::<u32>().prop_map(|v| PrimitiveValue::UInt(v as u64)).boxed(),
        PrimitiveType::UInt64 => any::<u64>().prop_map(PrimitiveValue::UInt).boxed(),
        PrimitiveType::Float => any::<f32>().prop_map(|v| PrimitiveValue::Float(v as f64)).boxed(),
        PrimitiveType::Double => any::<f64>().prop_map(PrimitiveValue::Float).boxed(),
    }
}

fn typed_value() -> impl Strategy<Value = (PrimitiveType, PrimitiveValue)> {
    prop::sample::select(PrimitiveType::ALL.to_vec()).prop_flat_map(|ty| (Just(ty), value_for(ty)))
}

proptest! {
    #[test]
    fn prop_primitive_round_trip(
        (ty, value) in typed_value(),
        order in byte_order(),
        index in 0usize..16,
    ) {
        let mut view = ByteView::with_capacity(32);
        let written = view.put_primitive(index, &value, ty, order).unwrap();
        prop_assert_eq!(written, ty.size());
        prop_assert_eq!(view.get_primitive(index, ty, order).unwrap(), value);
    }

    #[test]
    fn prop_out_of_range_never_panics(index in 0usize..64, len in 0usize..64) {
        let data = [0u8; 16];
        let view = ByteView::new(&data);
        prop_assert_eq!(view.slice(index, len).is_ok(), index + len <= data.len());
        prop_assert_eq!(view.get_u64_le(index).is_ok(), index + 8 <= data.len());
    }

    #[test]
    fn prop_growth_preserves_prefix(prefix in prop::collection::vec(any::<u8>(), 1..32), extra in 1usize..256) {
        let mut view = ByteView::growable(prefix.len());
        view.put_bytes(0, &prefix).unwrap();
        view.check_limit(prefix.len() + extra).unwrap();
        prop_assert!(view.capacity() >= prefix.len() + extra);
        prop_assert_eq!(&view.as_slice()[..prefix.len()], &prefix[..]);
    }
}
