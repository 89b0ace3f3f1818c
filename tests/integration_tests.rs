//! Integration tests for sbe-otf
//!
//! These tests build schemas by hand, encode messages through the generic
//! encoder and verify what the generic decoder reports back.

use sbe_otf::ir::{
    ByteOrder, Encoding, HeaderStructure, IntermediateRepresentation, IrDecoder, IrEncoder, Presence, Signal, Token,
};
use sbe_otf::otf::value::{chosen, resolve_choices, resolve_enum, resolve_value};
use sbe_otf::otf::{HeaderDecoder, HeaderEncoder, MessageDecoder, MessageEncoder, MessageHeader, TokenListener};
use sbe_otf::*;

fn header_tokens() -> Vec<Token> {
    vec![
        Token::new(Signal::BeginComposite, "messageHeader").with_size(8),
        Token::encoding("blockLength", PrimitiveType::UInt16),
        Token::encoding("templateId", PrimitiveType::UInt16).with_offset(2),
        Token::encoding("schemaId", PrimitiveType::UInt16).with_offset(4),
        Token::encoding("version", PrimitiveType::UInt16).with_offset(6),
        Token::new(Signal::EndComposite, "messageHeader"),
    ]
}

fn field(name: &str, id: i32, ty: PrimitiveType, offset: i32, version: i32) -> Vec<Token> {
    vec![
        Token::new(Signal::BeginField, name)
            .with_id(id)
            .with_offset(offset)
            .with_version(version),
        Token::encoding(name, ty).with_offset(offset).with_version(version),
        Token::new(Signal::EndField, name).with_id(id),
    ]
}

fn group(name: &str, id: i32, block_length: i32, body: Vec<Token>) -> Vec<Token> {
    let mut tokens = vec![
        Token::new(Signal::BeginGroup, name).with_id(id).with_size(block_length),
        Token::new(Signal::BeginComposite, "groupSizeEncoding").with_size(3),
        Token::encoding("blockLength", PrimitiveType::UInt16),
        Token::encoding("numInGroup", PrimitiveType::UInt8).with_offset(2),
        Token::new(Signal::EndComposite, "groupSizeEncoding"),
    ];
    tokens.extend(body);
    tokens.push(Token::new(Signal::EndGroup, name).with_id(id));
    tokens
}

fn var_data(name: &str, id: i32) -> Vec<Token> {
    vec![
        Token::new(Signal::BeginVarData, name).with_id(id),
        Token::new(Signal::BeginComposite, "varStringEncoding").with_size(-1),
        Token::encoding("length", PrimitiveType::UInt8),
        Token::encoding("varData", PrimitiveType::Char)
            .with_offset(1)
            .with_size(-1)
            .with_encoding(Encoding::new(PrimitiveType::Char).with_character_encoding("UTF-8")),
        Token::new(Signal::EndComposite, "varStringEncoding"),
        Token::new(Signal::EndVarData, name).with_id(id),
    ]
}

fn message(name: &str, id: i32, block_length: i32, body: Vec<Token>) -> Vec<Token> {
    let mut tokens = vec![Token::new(Signal::BeginMessage, name)
        .with_id(id)
        .with_size(block_length)];
    tokens.extend(body);
    tokens.push(Token::new(Signal::EndMessage, name).with_id(id));
    tokens
}

/// Records callbacks as readable strings
#[derive(Default)]
struct Recorder {
    events: Vec<String>,
    group_headers: Vec<(String, usize)>,
    var_data: Vec<(String, usize, usize)>,
}

impl TokenListener for Recorder {
    fn on_begin_message(&mut self, token: &Token) -> Result<()> {
        self.events.push(format!("message {}", token.name));
        Ok(())
    }

    fn on_end_message(&mut self, token: &Token) -> Result<()> {
        self.events.push(format!("/message {}", token.name));
        Ok(())
    }

    fn on_encoding(
        &mut self,
        field_token: &Token,
        buffer: &ByteView<'_>,
        buffer_index: usize,
        type_token: &Token,
        acting_version: i32,
    ) -> Result<()> {
        let value = resolve_value(buffer, buffer_index, type_token, acting_version)?;
        self.events.push(format!("{}={}", field_token.name, value));
        Ok(())
    }

    fn on_enum(
        &mut self,
        field_token: &Token,
        buffer: &ByteView<'_>,
        buffer_index: usize,
        tokens: &[Token],
        acting_version: i32,
    ) -> Result<()> {
        let name = resolve_enum(buffer, buffer_index, tokens, acting_version)?
            .map(|t| t.name.clone())
            .unwrap_or_else(|| "?".to_string());
        self.events.push(format!("{}={}", field_token.name, name));
        Ok(())
    }

    fn on_bit_set(
        &mut self,
        field_token: &Token,
        buffer: &ByteView<'_>,
        buffer_index: usize,
        tokens: &[Token],
        acting_version: i32,
    ) -> Result<()> {
        let set = resolve_choices(buffer, buffer_index, tokens, acting_version)?;
        let names: Vec<&str> = chosen(&set, tokens).map(|t| t.name.as_str()).collect();
        self.events.push(format!("{}={}", field_token.name, names.join("|")));
        Ok(())
    }

    fn on_group_header(&mut self, token: &Token, num_in_group: usize) -> Result<()> {
        self.group_headers.push((token.name.clone(), num_in_group));
        Ok(())
    }

    fn on_begin_group(&mut self, token: &Token, group_index: usize, num_in_group: usize) -> Result<()> {
        self.events
            .push(format!("{}[{}/{}]", token.name, group_index, num_in_group));
        Ok(())
    }

    fn on_end_group(&mut self, token: &Token, _group_index: usize, _num_in_group: usize) -> Result<()> {
        self.events.push(format!("/{}", token.name));
        Ok(())
    }

    fn on_var_data(
        &mut self,
        field_token: &Token,
        buffer: &ByteView<'_>,
        buffer_index: usize,
        length: usize,
        _type_token: &Token,
    ) -> Result<()> {
        let bytes = buffer.slice(buffer_index, length)?;
        self.var_data
            .push((field_token.name.clone(), buffer_index, length));
        self.events
            .push(format!("{}={}", field_token.name, String::from_utf8_lossy(bytes)));
        Ok(())
    }
}

impl Recorder {
    fn count(&self, event: &str) -> usize {
        self.events.iter().filter(|e| e.starts_with(event)).count()
    }
}

#[test]
fn test_group_with_three_repeats() {
    let mut body = field("account", 1, PrimitiveType::UInt32, 0, 0);
    body.extend(group("legs", 2, 4, field("price", 3, PrimitiveType::Int32, 0, 0)));
    let tokens = message("Order", 1, 4, body);

    let encoder = MessageEncoder::new(&tokens).unwrap();
    let mut buffer = ByteView::growable(8);
    encoder
        .put_field(&mut buffer, 0, "account", &PrimitiveValue::UInt(77))
        .unwrap();

    let legs = encoder.group("legs").unwrap();
    let mut pos = legs
        .put_dimensions(&mut buffer, encoder.block_length(), 3)
        .unwrap();
    for i in 0..3 {
        legs.put_field(&mut buffer, pos, "price", &PrimitiveValue::Int(-10 * i))
            .unwrap();
        pos += legs.block_length();
    }

    let mut recorder = Recorder::default();
    let end = MessageDecoder::decode(&buffer, 0, 0, encoder.block_length(), &tokens, &mut recorder).unwrap();

    assert_eq!(end, pos);
    assert_eq!(recorder.group_headers, [("legs".to_string(), 3)]);
    assert_eq!(recorder.count("legs["), 3);
    assert_eq!(recorder.count("/legs"), 3);
    assert_eq!(
        recorder.events,
        [
            "message Order",
            "account=77",
            "legs[0/3]",
            "price=0",
            "/legs",
            "legs[1/3]",
            "price=-10",
            "/legs",
            "legs[2/3]",
            "price=-20",
            "/legs",
            "/message Order",
        ]
    );
}

#[test]
fn test_nested_groups_two_by_two() {
    let mut cars = field("year", 11, PrimitiveType::UInt16, 0, 0);
    cars.extend(group("owners", 12, 1, field("age", 13, PrimitiveType::UInt8, 0, 0)));
    let tokens = message("Fleet", 2, 0, group("cars", 10, 2, cars));

    let encoder = MessageEncoder::new(&tokens).unwrap();
    let cars = encoder.group("cars").unwrap();
    let owners = cars.group("owners").unwrap();

    let mut buffer = ByteView::growable(4);
    let mut pos = cars.put_dimensions(&mut buffer, 0, 2).unwrap();
    for car in 0..2u64 {
        cars.put_field(&mut buffer, pos, "year", &PrimitiveValue::UInt(2000 + car))
            .unwrap();
        pos += cars.block_length();
        pos = owners.put_dimensions(&mut buffer, pos, 2).unwrap();
        for owner in 0..2u64 {
            owners
                .put_field(&mut buffer, pos, "age", &PrimitiveValue::UInt(30 + car * 10 + owner))
                .unwrap();
            pos += owners.block_length();
        }
    }

    let mut recorder = Recorder::default();
    let end = MessageDecoder::decode(&buffer, 0, 0, 0, &tokens, &mut recorder).unwrap();

    assert_eq!(end, pos);
    assert_eq!(recorder.count("cars["), 2);
    assert_eq!(recorder.count("owners["), 4);
    assert_eq!(recorder.count("/owners"), 4);
    let ages: Vec<&String> = recorder
        .events
        .iter()
        .filter(|e| e.starts_with("age="))
        .collect();
    assert_eq!(ages, ["age=30", "age=31", "age=40", "age=41"]);
}

#[test]
fn test_acting_version_gates_newer_fields() {
    let mut body = field("qty", 1, PrimitiveType::UInt32, 0, 0);
    body.extend(field("discount", 2, PrimitiveType::UInt16, 4, 2));
    let tokens = message("Fill", 3, 6, body);

    let data = [5, 0, 0, 0, 0x34, 0x12];
    let buffer = ByteView::new(&data);

    let mut old = Recorder::default();
    MessageDecoder::decode(&buffer, 0, 1, 6, &tokens, &mut old).unwrap();
    assert!(old.events.contains(&format!("discount={}", u16::MAX)));

    let mut current = Recorder::default();
    MessageDecoder::decode(&buffer, 0, 2, 6, &tokens, &mut current).unwrap();
    assert!(current.events.contains(&"discount=4660".to_string()));
}

#[test]
fn test_var_data_cursor_arithmetic() {
    let mut body = field("id", 1, PrimitiveType::UInt32, 0, 0);
    body.extend(var_data("text", 2));
    let tokens = message("Note", 4, 4, body);

    let offset = 12;
    let mut data = vec![0u8; offset];
    data.extend([5, b'h', b'e', b'l', b'l', b'o']);
    let buffer = ByteView::new(&data);

    let mut recorder = Recorder::default();
    let end = MessageDecoder::decode(&buffer, 8, 0, 4, &tokens, &mut recorder).unwrap();

    assert_eq!(recorder.var_data, [("text".to_string(), offset + 1, 5)]);
    assert_eq!(end, offset + 1 + 5);
    assert!(recorder.events.contains(&"text=hello".to_string()));
}

#[test]
fn test_var_data_inside_groups() {
    let mut entry = field("seq", 2, PrimitiveType::UInt8, 0, 0);
    entry.extend(var_data("memo", 3));
    let tokens = message("Log", 5, 0, group("entries", 1, 1, entry));

    let encoder = MessageEncoder::new(&tokens).unwrap();
    let entries = encoder.group("entries").unwrap();
    let mut buffer = ByteView::growable(4);
    let mut pos = entries.put_dimensions(&mut buffer, 0, 2).unwrap();
    for (seq, memo) in [(1u64, &b"ab"[..]), (2, &b""[..])] {
        entries
            .put_field(&mut buffer, pos, "seq", &PrimitiveValue::UInt(seq))
            .unwrap();
        pos = entries
            .put_var_data(&mut buffer, pos + entries.block_length(), "memo", memo)
            .unwrap();
    }

    let mut recorder = Recorder::default();
    let end = MessageDecoder::decode(&buffer, 0, 0, 0, &tokens, &mut recorder).unwrap();
    assert_eq!(end, pos);
    assert_eq!(
        recorder.var_data,
        [("memo".to_string(), 5, 2), ("memo".to_string(), 9, 0)]
    );
}

#[test]
fn test_enum_set_and_composite_fields() {
    let mut body = vec![
        Token::new(Signal::BeginField, "side").with_id(1),
        Token::new(Signal::BeginEnum, "Side")
            .with_size(1)
            .with_encoding(Encoding::new(PrimitiveType::Char)),
        Token::new(Signal::ValidValue, "Buy")
            .with_encoding(Encoding::new(PrimitiveType::Char).with_value(PrimitiveValue::Char(b'1'))),
        Token::new(Signal::ValidValue, "Sell")
            .with_encoding(Encoding::new(PrimitiveType::Char).with_value(PrimitiveValue::Char(b'2'))),
        Token::new(Signal::EndEnum, "Side"),
        Token::new(Signal::EndField, "side"),
        Token::new(Signal::BeginField, "flags").with_id(2),
        Token::new(Signal::BeginSet, "Flags")
            .with_offset(1)
            .with_size(2)
            .with_encoding(Encoding::new(PrimitiveType::UInt16).with_byte_order(ByteOrder::BigEndian)),
        Token::new(Signal::Choice, "hidden")
            .with_encoding(Encoding::new(PrimitiveType::UInt16).with_value(PrimitiveValue::UInt(0))),
        Token::new(Signal::Choice, "iceberg")
            .with_encoding(Encoding::new(PrimitiveType::UInt16).with_value(PrimitiveValue::UInt(9))),
        Token::new(Signal::EndSet, "Flags"),
        Token::new(Signal::EndField, "flags"),
        Token::new(Signal::BeginField, "price").with_id(3),
        Token::new(Signal::BeginComposite, "Decimal").with_offset(3).with_size(9),
        Token::encoding("mantissa", PrimitiveType::Int64),
        Token::encoding("exponent", PrimitiveType::Int8).with_offset(8),
        Token::new(Signal::EndComposite, "Decimal"),
        Token::new(Signal::EndField, "price"),
    ];
    body.extend(field("ref", 4, PrimitiveType::Char, 12, 0));
    let idx = body.len() - 2;
    body[idx] = body[idx].clone().with_size(4);
    let tokens = message("Order", 6, 16, body);

    let mut ir = IntermediateRepresentation::new("orders", 0, header_tokens()).unwrap();
    ir.add_message(6, tokens.clone()).unwrap();
    assert_eq!(ir.get_type("Decimal").unwrap().len(), 4);

    let encoder = MessageEncoder::new(&tokens).unwrap();
    let mut buffer = ByteView::with_capacity(16);
    encoder.put_enum(&mut buffer, 0, "side", "Sell").unwrap();
    encoder
        .put_choices(&mut buffer, 0, "flags", &["hidden", "iceberg"])
        .unwrap();
    encoder
        .put_composite_member(&mut buffer, 0, "price", "mantissa", &PrimitiveValue::Int(-125))
        .unwrap();
    encoder
        .put_composite_member(&mut buffer, 0, "price", "exponent", &PrimitiveValue::Int(-2))
        .unwrap();
    encoder
        .put_field(&mut buffer, 0, "ref", &PrimitiveValue::Bytes(b"X1".to_vec()))
        .unwrap();
    assert_eq!(&buffer.as_slice()[..3], &[b'2', 0x02, 0x01]);

    let mut recorder = Recorder::default();
    MessageDecoder::decode(&buffer, 0, 0, 16, &tokens, &mut recorder).unwrap();
    assert_eq!(
        recorder.events,
        [
            "message Order",
            "side=Sell",
            "flags=hidden|iceberg",
            "mantissa=-125",
            "exponent=-2",
            "ref=X1\0\0",
            "/message Order",
        ]
    );
}

#[test]
fn test_bootstrap_round_trip() {
    let mut body = field("qty", 1, PrimitiveType::UInt32, 0, 0);
    body[1].encoding = Encoding::new(PrimitiveType::UInt32)
        .with_presence(Presence::Optional)
        .with_null_value(PrimitiveValue::UInt(0))
        .with_semantic_type("Qty");
    body.extend(field("px", 2, PrimitiveType::Double, 4, 1));
    body.extend(group("fills", 3, 2, field("lot", 4, PrimitiveType::Int16, 0, 0)));
    body.extend(var_data("text", 5));

    let mut ir = IntermediateRepresentation::new("trading.v1", 1, header_tokens()).unwrap();
    ir.add_message(42, message("Execution", 42, 12, body)).unwrap();
    ir.add_message(7, message("Heartbeat", 7, 0, Vec::new())).unwrap();

    let bytes = IrEncoder::encode(&ir).unwrap();
    let decoded = IrDecoder::decode(&bytes).unwrap();

    assert_eq!(decoded, ir);
    assert_eq!(decoded.package_name(), "trading.v1");
    assert_eq!(decoded.messages().map(|(id, _)| id).collect::<Vec<_>>(), [42, 7]);

    let execution = decoded.message(42).unwrap();
    assert_eq!(execution.len(), ir.message(42).unwrap().len());
    for (left, right) in execution.iter().zip(ir.message(42).unwrap()) {
        assert_eq!(left, right);
    }

    let qty = &execution[2];
    assert_eq!(qty.encoding.semantic_type.as_deref(), Some("Qty"));
    assert_eq!(qty.encoding.character_encoding, None);
    assert_eq!(qty.encoding.epoch, None);
    assert_eq!(qty.encoding.null_value, Some(PrimitiveValue::UInt(0)));
}

#[test]
fn test_end_to_end_through_decoded_ir() {
    let mut body = field("price", 1, PrimitiveType::Int64, 0, 0);
    body.extend(var_data("venue", 2));
    let mut schema = IntermediateRepresentation::new("md", 3, header_tokens()).unwrap();
    schema.add_message(9, message("Trade", 9, 8, body)).unwrap();
    let ir = IrDecoder::decode(&IrEncoder::encode(&schema).unwrap()).unwrap();

    let tokens = ir.message(9).unwrap();
    let encoder = MessageEncoder::new(tokens).unwrap();
    let header = MessageHeader {
        block_length: encoder.block_length() as i64,
        template_id: 9,
        schema_id: 101,
        version: 3,
    };

    let mut buffer = ByteView::growable(16);
    let root = HeaderEncoder::new(ir.header_structure())
        .unwrap()
        .encode(&mut buffer, 0, &header)
        .unwrap();
    encoder
        .put_field(&mut buffer, root, "price", &PrimitiveValue::Int(1_234_500))
        .unwrap();
    let end = encoder
        .put_var_data(&mut buffer, root + encoder.block_length(), "venue", b"XLON")
        .unwrap();

    let headers = HeaderDecoder::new(ir.header_structure()).unwrap();
    let decoded = headers.decode(&buffer, 0).unwrap();
    assert_eq!(decoded, header);

    let mut recorder = Recorder::default();
    let decoded_end = MessageDecoder::decode(
        &buffer,
        headers.size(),
        decoded.version as i32,
        decoded.block_length as usize,
        ir.message(decoded.template_id).unwrap(),
        &mut recorder,
    )
    .unwrap();
    assert_eq!(decoded_end, end);
    assert_eq!(
        recorder.events,
        ["message Trade", "price=1234500", "venue=XLON", "/message Trade"]
    );
}

#[test]
fn test_header_shapes_are_schema_driven() {
    let with_reserved = vec![
        Token::new(Signal::BeginComposite, "messageHeader").with_size(6),
        Token::encoding("blockLength", PrimitiveType::UInt16),
        Token::encoding("templateId", PrimitiveType::UInt16).with_offset(2),
        Token::encoding("version", PrimitiveType::UInt8).with_offset(4),
        Token::encoding("reserved", PrimitiveType::UInt8).with_offset(5),
        Token::new(Signal::EndComposite, "messageHeader"),
    ];
    let structure = HeaderStructure::new(with_reserved).unwrap();
    assert_eq!(structure.size(), 6);
    assert_eq!(structure.schema_version().offset, 4);
    assert_eq!(
        HeaderDecoder::new(&structure),
        Err(Error::MissingHeaderField("schemaId"))
    );

    let structure = HeaderStructure::new(header_tokens()).unwrap();
    let decoder = HeaderDecoder::new(&structure).unwrap();
    let data = [16, 0, 2, 0, 1, 0, 5, 0];
    let buffer = ByteView::new(&data);
    assert_eq!(
        decoder.decode(&buffer, 0).unwrap(),
        MessageHeader {
            block_length: 16,
            template_id: 2,
            schema_id: 1,
            version: 5
        }
    );

    let mut no_template = header_tokens();
    no_template.remove(2);
    assert_eq!(
        IntermediateRepresentation::new("x", 0, no_template),
        Err(Error::MissingHeaderField("templateId"))
    );
}

#[test]
fn test_buffer_overflow_and_growth() {
    let mut fixed = [0u8; 4];
    let mut view = ByteView::new_mut(&mut fixed);
    assert_eq!(
        view.check_limit(8),
        Err(Error::BufferOverflow {
            limit: 8,
            capacity: 4
        })
    );
    view.put_u32_le(0, 0xDEADBEEF).unwrap();
    assert!(view.put_u32_le(2, 1).is_err());

    let mut backing = [1u8, 2, 3, 4];
    let mut view = ByteView::new_mut(&mut backing).with_overflow_handler(|_, limit| Some(vec![0u8; limit * 2]));
    view.check_limit(8).unwrap();
    view.put_u32_le(4, 0x0A0B0C0D).unwrap();
    assert_eq!(&view.as_slice()[..4], &[1, 2, 3, 4]);
    assert_eq!(view.get_u32_le(4).unwrap(), 0x0A0B0C0D);
    assert_eq!(view.capacity(), 16);
}

#[test]
fn test_malformed_schemas_rejected() {
    let mut ir = IntermediateRepresentation::new("x", 0, header_tokens()).unwrap();

    let mut unbalanced = message("Bad", 1, 4, field("a", 1, PrimitiveType::UInt8, 0, 0));
    unbalanced.remove(3);
    assert!(matches!(
        ir.add_message(1, unbalanced),
        Err(Error::MalformedTokenStream { .. })
    ));

    assert_eq!(ir.message(1), Err(Error::UnknownMessageId(1)));
    assert_eq!(
        ir.get_type("Nope"),
        Err(Error::UnknownTypeName("Nope".to_string()))
    );
}

#[test]
fn test_shared_ir_across_threads() {
    let mut body = field("seq", 1, PrimitiveType::UInt64, 0, 0);
    body.extend(group("items", 2, 2, field("v", 3, PrimitiveType::Int16, 0, 0)));
    let mut ir = IntermediateRepresentation::new("x", 0, header_tokens()).unwrap();
    ir.add_message(1, message("Batch", 1, 8, body)).unwrap();

    let tokens = ir.message(1).unwrap();
    let encoder = MessageEncoder::new(tokens).unwrap();
    let items = encoder.group("items").unwrap();
    let mut buffer = ByteView::growable(32);
    encoder
        .put_field(&mut buffer, 0, "seq", &PrimitiveValue::UInt(99))
        .unwrap();
    let mut pos = items.put_dimensions(&mut buffer, 8, 4).unwrap();
    for i in 0..4 {
        items
            .put_field(&mut buffer, pos, "v", &PrimitiveValue::Int(i))
            .unwrap();
        pos += items.block_length();
    }
    let bytes = buffer.into_vec();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let view = ByteView::new(&bytes);
                let mut recorder = Recorder::default();
                let end = MessageDecoder::decode(&view, 0, 0, 8, ir.message(1).unwrap(), &mut recorder).unwrap();
                assert_eq!(end, pos);
                assert_eq!(recorder.count("items["), 4);
            });
        }
    });
}

#[cfg(feature = "json")]
#[test]
fn test_json_rendering() {
    use sbe_otf::otf::JsonTokenListener;

    let mut body = field("id", 1, PrimitiveType::UInt32, 0, 0);
    body.extend(field("px", 2, PrimitiveType::Double, 4, 0));
    body.extend(var_data("note", 3));
    let tokens = message("Tick", 1, 12, body);

    let encoder = MessageEncoder::new(&tokens).unwrap();
    let mut buffer = ByteView::growable(16);
    encoder.put_field(&mut buffer, 0, "id", &PrimitiveValue::UInt(3)).unwrap();
    encoder.put_field(&mut buffer, 0, "px", &PrimitiveValue::Float(2.5)).unwrap();
    encoder.put_var_data(&mut buffer, 12, "note", b"ok").unwrap();

    let mut listener = JsonTokenListener::new();
    MessageDecoder::decode(&buffer, 0, 0, 12, &tokens, &mut listener).unwrap();
    assert_eq!(
        listener.into_value().unwrap(),
        serde_json::json!({ "id": 3, "px": 2.5, "note": "ok" })
    );
}
