//! Listener that renders a decoded message as JSON
//!
//! Fields become object members, composites nested objects, groups arrays of
//! objects. Enums render as the name of their valid value and sets as the
//! list of chosen names. Optional fields holding their null value render as
//! `null`.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use serde_json::{Map, Number, Value};

use crate::buffer::ByteView;
use crate::error::{Error, Result};
use crate::ir::Token;
use crate::otf::listener::TokenListener;
use crate::otf::value::{chosen, resolve_choices, resolve_element, resolve_enum, resolve_value};
use crate::primitive::{PrimitiveType, PrimitiveValue};

enum Frame {
    Object(Map<String, Value>),
    Array(Vec<Value>),
}

/// Builds a [`serde_json::Value`] from decode callbacks
#[derive(Default)]
pub struct JsonTokenListener {
    stack: Vec<Frame>,
    output: Option<Value>,
}

fn unbalanced() -> Error {
    Error::MalformedTokenStream {
        index: 0,
        reason: "unbalanced listener callbacks",
    }
}

fn to_json(value: &PrimitiveValue) -> Value {
    match value {
        PrimitiveValue::Char(c) => Value::String((*c as char).to_string()),
        PrimitiveValue::Int(v) => Value::from(*v),
        PrimitiveValue::UInt(v) => Value::from(*v),
        PrimitiveValue::Float(v) => Number::from_f64(*v).map_or(Value::Null, Value::Number),
        PrimitiveValue::Bytes(bytes) => {
            let text = bytes.split(|&b| b == 0).next().unwrap_or_default();
            Value::String(String::from_utf8_lossy(text).into_owned())
        }
    }
}

impl JsonTokenListener {
    /// Empty listener
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered message, once `on_end_message` has run
    pub fn into_value(self) -> Option<Value> {
        self.output
    }

    fn object(&mut self) -> Result<&mut Map<String, Value>> {
        match self.stack.last_mut() {
            Some(Frame::Object(map)) => Ok(map),
            _ => Err(unbalanced()),
        }
    }

    fn insert(&mut self, name: &str, value: Value) -> Result<()> {
        self.object()?.insert(name.to_string(), value);
        Ok(())
    }

    fn pop_object(&mut self) -> Result<Map<String, Value>> {
        match self.stack.pop() {
            Some(Frame::Object(map)) => Ok(map),
            _ => Err(unbalanced()),
        }
    }

    fn render(buffer: &ByteView<'_>, index: usize, token: &Token, acting_version: i32) -> Result<Value> {
        let ty = token.primitive_type()?;
        let value = resolve_value(buffer, index, token, acting_version)?;
        if token.is_optional_encoding() && value.is_null_for(ty) {
            return Ok(Value::Null);
        }
        if ty == PrimitiveType::Char || token.array_length() == 1 {
            return Ok(to_json(&value));
        }

        let mut elements = Vec::with_capacity(token.array_length());
        for element in 0..token.array_length() {
            elements.push(to_json(&resolve_element(buffer, index, token, element, acting_version)?));
        }
        Ok(Value::Array(elements))
    }
}

impl TokenListener for JsonTokenListener {
    fn on_begin_message(&mut self, _token: &Token) -> Result<()> {
        self.stack.clear();
        self.stack.push(Frame::Object(Map::new()));
        Ok(())
    }

    fn on_end_message(&mut self, _token: &Token) -> Result<()> {
        let map = self.pop_object()?;
        self.output = Some(Value::Object(map));
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
        let value = Self::render(buffer, buffer_index, type_token, acting_version)?;
        self.insert(&field_token.name, value)
    }

    fn on_enum(
        &mut self,
        field_token: &Token,
        buffer: &ByteView<'_>,
        buffer_index: usize,
        tokens: &[Token],
        acting_version: i32,
    ) -> Result<()> {
        let value = resolve_enum(buffer, buffer_index, tokens, acting_version)?
            .map_or(Value::Null, |valid| Value::String(valid.name.clone()));
        self.insert(&field_token.name, value)
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
        let names = chosen(&set, tokens)
            .map(|choice| Value::String(choice.name.clone()))
            .collect();
        self.insert(&field_token.name, Value::Array(names))
    }

    fn on_begin_composite(&mut self, _field_token: &Token, _tokens: &[Token]) -> Result<()> {
        self.stack.push(Frame::Object(Map::new()));
        Ok(())
    }

    fn on_end_composite(&mut self, field_token: &Token, _tokens: &[Token]) -> Result<()> {
        let map = self.pop_object()?;
        self.insert(&field_token.name, Value::Object(map))
    }

    fn on_group_header(&mut self, token: &Token, num_in_group: usize) -> Result<()> {
        if num_in_group == 0 {
            return self.insert(&token.name, Value::Array(Vec::new()));
        }
        self.stack.push(Frame::Array(Vec::new()));
        Ok(())
    }

    fn on_begin_group(&mut self, _token: &Token, _group_index: usize, _num_in_group: usize) -> Result<()> {
        self.stack.push(Frame::Object(Map::new()));
        Ok(())
    }

    fn on_end_group(&mut self, token: &Token, group_index: usize, num_in_group: usize) -> Result<()> {
        let entry = self.pop_object()?;
        match self.stack.last_mut() {
            Some(Frame::Array(entries)) => entries.push(Value::Object(entry)),
            _ => return Err(unbalanced()),
        }

        if group_index + 1 == num_in_group {
            let entries = match self.stack.pop() {
                Some(Frame::Array(entries)) => entries,
                _ => return Err(unbalanced()),
            };
            self.insert(&token.name, Value::Array(entries))?;
        }
        Ok(())
    }

    fn on_var_data(
        &mut self,
        field_token: &Token,
        buffer: &ByteView<'_>,
        buffer_index: usize,
        length: usize,
        type_token: &Token,
    ) -> Result<()> {
        let bytes = buffer.slice(buffer_index, length)?;
        let value = match type_token.encoding.primitive_type {
            Some(PrimitiveType::Char) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
            _ => Value::Array(bytes.iter().map(|&b| Value::from(b)).collect()),
        };
        self.insert(&field_token.name, value)
    }
}
