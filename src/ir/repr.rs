//! In-memory intermediate representation of a schema

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::ir::token::{Signal, Token};
use crate::ir::validate::{find_matching_end, validate, validate_message};

/// Header token list with the positions of its role-bearing entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderStructure {
    tokens: Vec<Token>,
    block_length: usize,
    template_id: usize,
    schema_id: Option<usize>,
    schema_version: usize,
}

impl HeaderStructure {
    /// Name of the block length entry
    pub const BLOCK_LENGTH: &'static str = "blockLength";
    /// Name of the template id entry
    pub const TEMPLATE_ID: &'static str = "templateId";
    /// Name of the schema id entry
    pub const SCHEMA_ID: &'static str = "schemaId";
    /// Name of the schema version entry
    pub const SCHEMA_VERSION: &'static str = "version";

    /// Capture a header composite.
    ///
    /// The tokens must form one composite holding encodings named
    /// `blockLength`, `templateId` and `version`; `schemaId` is optional.
    pub fn new(tokens: Vec<Token>) -> Result<Self> {
        validate(&tokens)?;
        if tokens.first().map(|t| t.signal) != Some(Signal::BeginComposite)
            || find_matching_end(&tokens, 0) != Some(tokens.len() - 1)
        {
            return Err(Error::MalformedTokenStream {
                index: 0,
                reason: "header must be a single composite",
            });
        }

        // roles are direct members; nested composites have their own offsets
        let mut members = Vec::new();
        let mut index = 1;
        while index < tokens.len() - 1 {
            if tokens[index].signal == Signal::Encoding {
                members.push(index);
                index += 1;
            } else {
                index = find_matching_end(&tokens, index).map_or(index + 1, |end| end + 1);
            }
        }
        let find = |name: &str| members.iter().copied().find(|&i| tokens[i].name == name);
        let require = |name: &'static str| find(name).ok_or(Error::MissingHeaderField(name));

        Ok(Self {
            block_length: require(Self::BLOCK_LENGTH)?,
            template_id: require(Self::TEMPLATE_ID)?,
            schema_id: find(Self::SCHEMA_ID),
            schema_version: require(Self::SCHEMA_VERSION)?,
            tokens,
        })
    }

    /// All header tokens
    #[inline]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Encoded size of the header composite
    #[inline]
    pub fn size(&self) -> usize {
        self.tokens[0].encoded_length()
    }

    /// Block length entry
    #[inline]
    pub fn block_length(&self) -> &Token {
        &self.tokens[self.block_length]
    }

    /// Template id entry
    #[inline]
    pub fn template_id(&self) -> &Token {
        &self.tokens[self.template_id]
    }

    /// Schema id entry, if the header carries one
    #[inline]
    pub fn schema_id(&self) -> Option<&Token> {
        self.schema_id.map(|i| &self.tokens[i])
    }

    /// Schema version entry
    #[inline]
    pub fn schema_version(&self) -> &Token {
        &self.tokens[self.schema_version]
    }
}

/// Schema model: the shared header plus per-message and per-type token lists.
///
/// Built once, then shared read-only between decoders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntermediateRepresentation {
    package_name: String,
    version: i32,
    header: HeaderStructure,
    messages: Vec<(i64, Vec<Token>)>,
    message_index: BTreeMap<i64, usize>,
    types: BTreeMap<String, Vec<Token>>,
}

impl IntermediateRepresentation {
    /// Start an IR with its header composite
    pub fn new(package_name: impl Into<String>, version: i32, header_tokens: Vec<Token>) -> Result<Self> {
        let header = HeaderStructure::new(header_tokens)?;
        let mut ir = Self {
            package_name: package_name.into(),
            version,
            header,
            messages: Vec::new(),
            message_index: BTreeMap::new(),
            types: BTreeMap::new(),
        };
        let header_tokens = ir.header.tokens.clone();
        ir.capture_types(&header_tokens);
        Ok(ir)
    }

    /// Register a message; a repeated id replaces the earlier message in place
    pub fn add_message(&mut self, id: i64, tokens: Vec<Token>) -> Result<()> {
        validate_message(&tokens)?;
        self.capture_types(&tokens);

        match self.message_index.get(&id) {
            Some(&slot) => self.messages[slot].1 = tokens,
            None => {
                self.message_index.insert(id, self.messages.len());
                self.messages.push((id, tokens));
            }
        }
        Ok(())
    }

    fn capture_types(&mut self, tokens: &[Token]) {
        for (index, token) in tokens.iter().enumerate() {
            let is_type = matches!(
                token.signal,
                Signal::BeginComposite | Signal::BeginEnum | Signal::BeginSet
            );
            if !is_type || token.name.is_empty() {
                continue;
            }
            if let Some(end) = find_matching_end(tokens, index) {
                self.types
                    .entry(token.name.to_string())
                    .or_insert_with(|| tokens[index..=end].to_vec());
            }
        }
    }

    /// Token list of a message
    pub fn message(&self, id: i64) -> Result<&[Token]> {
        self.message_index
            .get(&id)
            .map(|&slot| self.messages[slot].1.as_slice())
            .ok_or(Error::UnknownMessageId(id))
    }

    /// Token list of a named composite, enum or set
    pub fn get_type(&self, name: &str) -> Result<&[Token]> {
        self.types
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::UnknownTypeName(name.to_string()))
    }

    /// Messages in registration order
    pub fn messages(&self) -> impl Iterator<Item = (i64, &[Token])> + '_ {
        self.messages.iter().map(|(id, tokens)| (*id, tokens.as_slice()))
    }

    /// Captured types ordered by name
    pub fn types(&self) -> impl Iterator<Item = (&str, &[Token])> + '_ {
        self.types.iter().map(|(name, tokens)| (name.as_str(), tokens.as_slice()))
    }

    /// Number of registered messages
    #[inline]
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Header layout shared by all messages
    #[inline]
    pub fn header_structure(&self) -> &HeaderStructure {
        &self.header
    }

    /// Package the schema belongs to
    #[inline]
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// Schema version
    #[inline]
    pub fn version(&self) -> i32 {
        self.version
    }
}
