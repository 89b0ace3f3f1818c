//! Decode a message whose layout is only known at runtime
//!
//! Run with: cargo run --example otf_decode

use sbe_otf::ir::{Encoding, IrDecoder, IrEncoder, Presence, Signal};
use sbe_otf::otf::value::{chosen, resolve_choices, resolve_enum, resolve_value};
use sbe_otf::otf::{HeaderDecoder, HeaderEncoder, MessageEncoder, MessageHeader};
use sbe_otf::primitive::{PrimitiveType, PrimitiveValue};
use sbe_otf::{ByteView, Error, IntermediateRepresentation, MessageDecoder, Token, TokenListener};

const SCHEMA_ID: i64 = 91;
const TRADE_ID: i64 = 2;

/// Prints every decoded element, indented by nesting depth
#[derive(Default)]
struct Printer {
    depth: usize,
}

impl Printer {
    fn line(&self, text: std::fmt::Arguments<'_>) {
        println!("{:width$}{}", "", text, width = self.depth * 2);
    }
}

impl TokenListener for Printer {
    fn on_begin_message(&mut self, token: &Token) -> sbe_otf::Result<()> {
        self.line(format_args!("{} {{", token.name));
        self.depth += 1;
        Ok(())
    }

    fn on_end_message(&mut self, _token: &Token) -> sbe_otf::Result<()> {
        self.depth -= 1;
        self.line(format_args!("}}"));
        Ok(())
    }

    fn on_encoding(
        &mut self,
        field: &Token,
        buffer: &ByteView<'_>,
        index: usize,
        token: &Token,
        acting_version: i32,
    ) -> sbe_otf::Result<()> {
        let value = resolve_value(buffer, index, token, acting_version)?;
        let ty = token.primitive_type()?;
        if token.is_optional_encoding() && value.is_null_for(ty) {
            self.line(format_args!("{}: null", field.name));
        } else {
            self.line(format_args!("{}: {}", field.name, value));
        }
        Ok(())
    }

    fn on_enum(
        &mut self,
        field: &Token,
        buffer: &ByteView<'_>,
        index: usize,
        tokens: &[Token],
        acting_version: i32,
    ) -> sbe_otf::Result<()> {
        let name = resolve_enum(buffer, index, tokens, acting_version)?.map_or("<unknown>", |valid| valid.name.as_str());
        self.line(format_args!("{}: {}", field.name, name));
        Ok(())
    }

    fn on_bit_set(
        &mut self,
        field: &Token,
        buffer: &ByteView<'_>,
        index: usize,
        tokens: &[Token],
        acting_version: i32,
    ) -> sbe_otf::Result<()> {
        let set = resolve_choices(buffer, index, tokens, acting_version)?;
        let names: Vec<&str> = chosen(&set, tokens).map(|choice| choice.name.as_str()).collect();
        self.line(format_args!("{}: {:?}", field.name, names));
        Ok(())
    }

    fn on_group_header(&mut self, token: &Token, num_in_group: usize) -> sbe_otf::Result<()> {
        self.line(format_args!("{} x{}", token.name, num_in_group));
        Ok(())
    }

    fn on_begin_group(&mut self, _token: &Token, group_index: usize, _num_in_group: usize) -> sbe_otf::Result<()> {
        self.line(format_args!("[{}] {{", group_index));
        self.depth += 1;
        Ok(())
    }

    fn on_end_group(&mut self, _token: &Token, _group_index: usize, _num_in_group: usize) -> sbe_otf::Result<()> {
        self.depth -= 1;
        self.line(format_args!("}}"));
        Ok(())
    }

    fn on_var_data(
        &mut self,
        field: &Token,
        buffer: &ByteView<'_>,
        index: usize,
        length: usize,
        _token: &Token,
    ) -> sbe_otf::Result<()> {
        let bytes = buffer.slice(index, length)?;
        self.line(format_args!("{}: {:?}", field.name, String::from_utf8_lossy(bytes)));
        Ok(())
    }
}

fn field(name: &str, type_token: Token) -> [Token; 3] {
    let offset = type_token.offset;
    [
        Token::new(Signal::BeginField, name).with_offset(offset),
        type_token,
        Token::new(Signal::EndField, name),
    ]
}

fn build_schema() -> Result<IntermediateRepresentation, Error> {
    let header = vec![
        Token::new(Signal::BeginComposite, "messageHeader").with_size(8),
        Token::encoding("blockLength", PrimitiveType::UInt16),
        Token::encoding("templateId", PrimitiveType::UInt16).with_offset(2),
        Token::encoding("schemaId", PrimitiveType::UInt16).with_offset(4),
        Token::encoding("version", PrimitiveType::UInt16).with_offset(6),
        Token::new(Signal::EndComposite, "messageHeader"),
    ];

    let mut trade = vec![Token::new(Signal::BeginMessage, "Trade").with_id(TRADE_ID as i32).with_size(18)];
    trade.extend(field("price", Token::encoding("price", PrimitiveType::Int64)));
    trade.extend(field(
        "quantity",
        Token::encoding("quantity", PrimitiveType::UInt32).with_offset(8),
    ));
    trade.extend([
        Token::new(Signal::BeginField, "side").with_offset(12),
        Token::new(Signal::BeginEnum, "Side")
            .with_offset(12)
            .with_size(1)
            .with_encoding(Encoding::new(PrimitiveType::Char)),
        Token::new(Signal::ValidValue, "Buy").with_encoding(Encoding::new(PrimitiveType::Char).with_value(PrimitiveValue::Char(b'B'))),
        Token::new(Signal::ValidValue, "Sell").with_encoding(Encoding::new(PrimitiveType::Char).with_value(PrimitiveValue::Char(b'S'))),
        Token::new(Signal::EndEnum, "Side"),
        Token::new(Signal::EndField, "side"),
        Token::new(Signal::BeginField, "flags").with_offset(13),
        Token::new(Signal::BeginSet, "Flags")
            .with_offset(13)
            .with_size(1)
            .with_encoding(Encoding::new(PrimitiveType::UInt8)),
        Token::new(Signal::Choice, "auction").with_encoding(Encoding::new(PrimitiveType::UInt8).with_value(PrimitiveValue::UInt(0))),
        Token::new(Signal::Choice, "block").with_encoding(Encoding::new(PrimitiveType::UInt8).with_value(PrimitiveValue::UInt(1))),
        Token::new(Signal::EndSet, "Flags"),
        Token::new(Signal::EndField, "flags"),
    ]);
    trade.extend(field(
        "yield",
        Token::encoding("yield", PrimitiveType::Float)
            .with_offset(14)
            .with_encoding(Encoding::new(PrimitiveType::Float).with_presence(Presence::Optional)),
    ));
    trade.extend([
        Token::new(Signal::BeginGroup, "fills").with_size(4),
        Token::new(Signal::BeginComposite, "groupSizeEncoding").with_size(3),
        Token::encoding("blockLength", PrimitiveType::UInt16),
        Token::encoding("numInGroup", PrimitiveType::UInt8).with_offset(2),
        Token::new(Signal::EndComposite, "groupSizeEncoding"),
    ]);
    trade.extend(field("fillQty", Token::encoding("fillQty", PrimitiveType::UInt32)));
    trade.extend([
        Token::new(Signal::EndGroup, "fills"),
        Token::new(Signal::BeginVarData, "venue"),
        Token::new(Signal::BeginComposite, "varStringEncoding").with_size(-1),
        Token::encoding("length", PrimitiveType::UInt8),
        Token::encoding("varData", PrimitiveType::Char)
            .with_offset(1)
            .with_size(-1)
            .with_encoding(Encoding::new(PrimitiveType::Char).with_character_encoding("UTF-8")),
        Token::new(Signal::EndComposite, "varStringEncoding"),
        Token::new(Signal::EndVarData, "venue"),
        Token::new(Signal::EndMessage, "Trade").with_id(TRADE_ID as i32),
    ]);

    let mut ir = IntermediateRepresentation::new("demo.trading", 0, header)?;
    ir.add_message(TRADE_ID, trade)?;
    Ok(ir)
}

fn encode_trade(ir: &IntermediateRepresentation) -> Result<Vec<u8>, Error> {
    let encoder = MessageEncoder::new(ir.message(TRADE_ID)?)?;
    let mut buffer = ByteView::growable(32);
    let header = MessageHeader {
        block_length: encoder.block_length() as i64,
        template_id: TRADE_ID,
        schema_id: SCHEMA_ID,
        version: 0,
    };
    let body = HeaderEncoder::new(ir.header_structure())?.encode(&mut buffer, 0, &header)?;
    encoder.put_field(&mut buffer, body, "price", &PrimitiveValue::Int(50_125))?;
    encoder.put_field(&mut buffer, body, "quantity", &PrimitiveValue::UInt(300))?;
    encoder.put_enum(&mut buffer, body, "side", "Sell")?;
    encoder.put_choices(&mut buffer, body, "flags", &["block"])?;
    encoder.put_field(&mut buffer, body, "yield", &PrimitiveValue::Float(f64::NAN))?;

    let fills = encoder.group("fills")?;
    let mut index = fills.put_dimensions(&mut buffer, body + encoder.block_length(), 2)?;
    for qty in [100u64, 200] {
        fills.put_field(&mut buffer, index, "fillQty", &PrimitiveValue::UInt(qty))?;
        index += fills.block_length();
    }
    let end = encoder.put_var_data(&mut buffer, index, "venue", b"XLON")?;

    let mut bytes = buffer.into_vec();
    bytes.truncate(end);
    Ok(bytes)
}

fn main() -> Result<(), Error> {
    println!("OTF Decode Example");
    println!("==================");

    // The schema travels as bootstrap IR bytes
    let schema = IrEncoder::encode(&build_schema()?)?;
    println!("\nSchema IR: {} bytes", schema.len());
    let ir = IrDecoder::decode(&schema)?;
    println!("Package {:?}, {} message(s)", ir.package_name(), ir.message_count());

    let message = encode_trade(&ir)?;
    println!("Encoded message: {} bytes\n", message.len());

    let buffer = ByteView::new(&message);
    let headers = HeaderDecoder::new(ir.header_structure())?;
    let header = headers.decode(&buffer, 0)?;
    println!(
        "Header: templateId={} schemaId={} version={} blockLength={}\n",
        header.template_id, header.schema_id, header.version, header.block_length
    );

    let end = MessageDecoder::decode(
        &buffer,
        headers.size(),
        header.version as i32,
        header.block_length as usize,
        ir.message(header.template_id)?,
        &mut Printer::default(),
    )?;
    println!("\nConsumed {} of {} bytes", end, message.len());
    Ok(())
}
