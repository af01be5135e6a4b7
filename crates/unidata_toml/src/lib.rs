//! The subset of TOML used by the compiler settings.
//!
//! Supported: comments, `[table]` and `[dotted.table]` headers, dotted keys, basic and literal strings,
//! integers (decimal, `0x`, `0o`, `0b`, with `_` separators), booleans and single-line arrays.
use std::collections::HashMap;
use unidata_parser_utils::{str_parser::StrParser, ParserError};

/// TOML parsing error
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("Failed to parse toml: {0}")]
pub struct TomlParseError(pub ParserError);

#[derive(Clone, Debug, PartialEq)]
pub enum Item {
	String(String),
	Integer(i64),
	Boolean(bool),
	Array(Vec<Item>),
	Table(Table),
}

/// Toml table, keeps the order in which keys were added
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
	items   : Vec<(String, Item)>,
	mapping : HashMap<String, usize>,
}

impl Table {
	pub fn new() -> Self {
		Self::default()
	}

	/// Append an item to the table, returns `false` if the key already exists
	pub fn push(&mut self, key: String, item: Item) -> bool {
		if self.mapping.contains_key(&key) {
			return false;
		}
		self.mapping.insert(key.clone(), self.items.len());
		self.items.push((key, item));
		true
	}

	/// Append an item under a dotted key path, creating intermediate tables.
	///
	/// # Error
	///
	/// Returns the index of the key at which the push failed, because the key already exists or points to a non-table
	pub fn push_multi_key(&mut self, keys: &[String], item: Item) -> Result<(), usize> {
		match keys {
			[] => Err(0),
			[key] => if self.push(key.clone(), item) { Ok(()) } else { Err(0) },
			[key, rest @ ..] => self.get_or_add_table(key)
				.ok_or(0usize)?
				.push_multi_key(rest, item)
				.map_err(|idx| idx + 1),
		}
	}

	/// Get an element from the table
	pub fn get_item(&self, key: &str) -> Option<&Item> {
		self.mapping.get(key).map(|idx| &self.items[*idx].1)
	}

	/// Get an element from the table, if it has the requested type
	pub fn get<T: FromTomlItem + ?Sized>(&self, key: &str) -> Option<&T> {
		self.get_item(key).and_then(T::from_item)
	}

	/// Get a nested table
	pub fn get_table(&self, key: &str) -> Option<&Table> {
		self.get(key)
	}

	/// Get a mutable element from the table
	pub fn get_mut(&mut self, key: &str) -> Option<&mut Item> {
		let idx = *self.mapping.get(key)?;
		Some(&mut self.items[idx].1)
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	/// Iterate over all keys and items, in insertion order
	pub fn iter(&self) -> impl Iterator<Item = (&str, &Item)> {
		self.items.iter().map(|(key, item)| (key.as_str(), item))
	}

	fn get_or_add_table(&mut self, key: &str) -> Option<&mut Table> {
		if !self.mapping.contains_key(key) {
			self.push(key.to_string(), Item::Table(Table::new()));
		}
		match self.get_mut(key)? {
			Item::Table(table) => Some(table),
			_ => None,
		}
	}

	fn get_or_add_table_path(&mut self, keys: &[String]) -> Option<&mut Table> {
		match keys.split_first() {
			None => Some(self),
			Some((key, rest)) => self.get_or_add_table(key)?.get_or_add_table_path(rest),
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Toml {
	table : Table,
}

impl Toml {
	/// Create a new toml
	pub fn new() -> Self {
		Self::default()
	}

	/// Parse toml from a string
	pub fn parse(source: &str) -> Result<Self, TomlParseError> {
		Parser { parser: StrParser::new(source) }.parse()
	}

	/// Get an element from the root table
	pub fn get(&self, key: &str) -> Option<&Item> {
		self.table.get_item(key)
	}

	/// Get a table from the root table
	pub fn get_table(&self, key: &str) -> Option<&Table> {
		self.table.get_table(key)
	}

	/// Get the root table
	pub fn root(&self) -> &Table {
		&self.table
	}
}

struct Parser<'a> {
	parser : StrParser<'a>,
}

impl<'a> Parser<'a> {
	fn parse(&mut self) -> Result<Toml, TomlParseError> {
		let mut toml = Toml::new();
		// Path of the table introduced by the last `[header]`
		let mut current = Vec::new();

		self.parser.consume_whitespace(true);
		while self.parser.can_parse() {
			if self.parser.string.starts_with('#') {
				self.parser.consume_to_eol();
			} else if self.parser.string.starts_with("[[") {
				return Err(self.error("Arrays of tables are not supported"));
			} else if self.parser.consume_char('[') {
				self.parser.consume_whitespace(false);
				current = self.parse_keys()?;
				self.parser.consume_whitespace(false);
				if !self.parser.consume_char(']') {
					return Err(self.error("Table is not closed"));
				}
				if toml.table.get_or_add_table_path(&current).is_none() {
					return Err(self.error("Path does not point to a table"));
				}
				self.expect_eol()?;
			} else {
				let (keys, item) = self.parse_key_item()?;
				let table = match toml.table.get_or_add_table_path(&current) {
					Some(table) => table,
					None => return Err(self.error("Path does not point to a table")),
				};
				if table.push_multi_key(&keys, item).is_err() {
					return Err(self.error("Duplicate key"));
				}
				self.expect_eol()?;
			}

			self.parser.consume_whitespace(true);
		}
		Ok(toml)
	}

	fn expect_eol(&mut self) -> Result<(), TomlParseError> {
		self.parser.consume_whitespace(false);
		if self.parser.string.starts_with('#') || self.parser.at_eol() {
			self.parser.consume_to_eol();
			Ok(())
		} else {
			Err(self.error("Expected the end of the line"))
		}
	}

	fn parse_key_item(&mut self) -> Result<(Vec<String>, Item), TomlParseError> {
		let keys = self.parse_keys()?;
		self.parser.consume_whitespace(false);
		if !self.parser.consume_char('=') {
			return Err(self.error("Key is not followed by an `=`"));
		}
		self.parser.consume_whitespace(false);
		let item = self.parse_item()?;
		Ok((keys, item))
	}

	fn parse_keys(&mut self) -> Result<Vec<String>, TomlParseError> {
		let mut keys = Vec::new();
		loop {
			let key = if self.parser.string.starts_with('"') {
				let raw = self.parser.extract_delimited('"').ok_or_else(|| self.error("Invalid key"))?;
				self.unescape(raw)?
			} else {
				let key = self.parser.extract_until(|ch: char| !ch.is_ascii_alphanumeric() && ch != '-' && ch != '_');
				if key.is_empty() {
					return Err(self.error("Expected a key"));
				}
				key.to_string()
			};
			keys.push(key);

			self.parser.consume_whitespace(false);
			if !self.parser.consume_char('.') {
				return Ok(keys);
			}
			self.parser.consume_whitespace(false);
		}
	}

	fn parse_item(&mut self) -> Result<Item, TomlParseError> {
		let ch = match self.parser.peek() {
			Some(ch) => ch,
			None => return Err(self.error("Expected a value, found the end of the file")),
		};

		match ch {
			'"' => {
				let raw = self.parser.extract_delimited('"').ok_or_else(|| self.error("Invalid string"))?;
				Ok(Item::String(self.unescape(raw)?))
			},
			'\'' => {
				// Literal strings have no escapes, so a `\'` ends the string
				let string = self.parser.string;
				let rest = &string[1..];
				match rest.find(['\'', '\n']) {
					Some(idx) if rest[idx..].starts_with('\'') => {
						self.parser.consume_count(idx + 2);
						Ok(Item::String(rest[..idx].to_string()))
					},
					_ => Err(self.error("Invalid string")),
				}
			},
			'[' => self.parse_array(),
			ch if ch.is_ascii_digit() || ch == '-' || ch == '+' => self.parse_integer(),
			_ => {
				let word = self.parser.extract_until(|ch: char| !ch.is_ascii_alphanumeric());
				match word {
					"true" => Ok(Item::Boolean(true)),
					"false" => Ok(Item::Boolean(false)),
					_ => Err(self.error("Invalid item")),
				}
			},
		}
	}

	fn parse_integer(&mut self) -> Result<Item, TomlParseError> {
		let s = self.parser.extract_until(|ch: char| !ch.is_ascii_alphanumeric() && ch != '-' && ch != '+' && ch != '_');
		let mut s = s.to_string();
		s.retain(|ch| ch != '_');

		let (negative, digits) = match s.strip_prefix('-') {
			Some(digits) => (true, digits),
			None => (false, s.strip_prefix('+').unwrap_or(&s)),
		};
		let (radix, digits) = if let Some(digits) = digits.strip_prefix("0x") {
			(16, digits)
		} else if let Some(digits) = digits.strip_prefix("0o") {
			(8, digits)
		} else if let Some(digits) = digits.strip_prefix("0b") {
			(2, digits)
		} else {
			(10, digits)
		};

		match i64::from_str_radix(digits, radix) {
			Ok(val) if negative => Ok(Item::Integer(-val)),
			Ok(val) => Ok(Item::Integer(val)),
			Err(_) => Err(self.error("Invalid integer literal")),
		}
	}

	fn parse_array(&mut self) -> Result<Item, TomlParseError> {
		let valid = self.parser.consume_char('[');
		debug_assert!(valid);

		let mut arr = Vec::new();
		loop {
			self.parser.consume_whitespace(false);
			if self.parser.consume_char(']') {
				return Ok(Item::Array(arr));
			}
			arr.push(self.parse_item()?);
			self.parser.consume_whitespace(false);
			if !self.parser.consume_char(',') {
				return if self.parser.consume_char(']') {
					Ok(Item::Array(arr))
				} else {
					Err(self.error("Array was not ended correctly"))
				};
			}
		}
	}

	fn unescape(&self, raw: &str) -> Result<String, TomlParseError> {
		let mut res = String::with_capacity(raw.len());
		let mut chars = raw.chars();
		while let Some(ch) = chars.next() {
			if ch != '\\' {
				res.push(ch);
				continue;
			}
			match chars.next() {
				Some('"')  => res.push('"'),
				Some('\\') => res.push('\\'),
				Some('n')  => res.push('\n'),
				Some('t')  => res.push('\t'),
				Some('r')  => res.push('\r'),
				_ => return Err(self.error("Unsupported escape sequence")),
			}
		}
		Ok(res)
	}

	fn error(&self, msg: &'static str) -> TomlParseError {
		TomlParseError(self.parser.error(msg))
	}
}

pub trait FromTomlItem {
	fn from_item(item: &Item) -> Option<&Self>;
}

impl FromTomlItem for Item {
	fn from_item(item: &Item) -> Option<&Self> {
		Some(item)
	}
}

impl FromTomlItem for str {
	fn from_item(item: &Item) -> Option<&Self> {
		match item {
			Item::String(s) => Some(s.as_str()),
			_ => None,
		}
	}
}

macro_rules! impl_from_toml_item {
	($ty:ty => $iden:ident) => {
		impl FromTomlItem for $ty {
			fn from_item(item: &Item) -> Option<&Self> {
				if let Item::$iden(s) = item {
					Some(s)
				} else {
					None
				}
			}
		}
	};
}
impl_from_toml_item!(String => String);
impl_from_toml_item!(i64 => Integer);
impl_from_toml_item!(bool => Boolean);
impl_from_toml_item!(Vec<Item> => Array);
impl_from_toml_item!(Table => Table);

#[cfg(test)]
mod tests {
	use super::*;

	const SETTINGS: &str = r#"
# compiler settings
[paths]
data-dir = "ucd/15.1"   # inputs
out-dir = 'out\dir'

[logging]
level = "verbose"
always-flush = true
max = 0x1F
"#;

	#[test]
	fn parses_tables_and_values() {
		let toml = Toml::parse(SETTINGS).unwrap();

		let paths = toml.get_table("paths").unwrap();
		assert_eq!(paths.get::<str>("data-dir"), Some("ucd/15.1"));
		assert_eq!(paths.get::<str>("out-dir"), Some("out\\dir"));

		let logging = toml.get_table("logging").unwrap();
		assert_eq!(logging.get::<str>("level"), Some("verbose"));
		assert_eq!(logging.get::<bool>("always-flush"), Some(&true));
		assert_eq!(logging.get::<i64>("max"), Some(&0x1F));
	}

	#[test]
	fn keeps_insertion_order() {
		let toml = Toml::parse("b = 1\na = 2\n").unwrap();
		let keys = toml.root().iter().map(|(key, _)| key).collect::<Vec<_>>();
		assert_eq!(keys, ["b", "a"]);
	}

	#[test]
	fn dotted_keys_create_tables() {
		let toml = Toml::parse("output.verify = false\n\"quoted key\" = \"a\\\"b\"").unwrap();
		assert_eq!(toml.get_table("output").unwrap().get::<bool>("verify"), Some(&false));
		assert_eq!(toml.root().get::<str>("quoted key"), Some("a\"b"));
	}

	#[test]
	fn parses_arrays_and_integers() {
		let toml = Toml::parse("list = [1, -2, 0b11, \"x\", ]\nbig = 1_000").unwrap();
		let list = toml.root().get::<Vec<Item>>("list").unwrap();
		assert_eq!(list, &vec![Item::Integer(1), Item::Integer(-2), Item::Integer(3), Item::String("x".to_string())]);
		assert_eq!(toml.root().get::<i64>("big"), Some(&1000));
	}

	#[test]
	fn reports_error_position() {
		let err = Toml::parse("[paths]\ndata-dir \"x\"").unwrap_err();
		assert_eq!(err.0.line, 2);
		assert_eq!(err.0.msg, "Key is not followed by an `=`");
	}

	#[test]
	fn rejects_duplicate_keys() {
		assert!(Toml::parse("a = 1\na = 2").is_err());
	}

	#[test]
	fn rejects_trailing_garbage() {
		assert!(Toml::parse("a = 1 2").is_err());
		assert!(Toml::parse("a = \"open").is_err());
	}

	#[test]
	fn wrong_type_is_none() {
		let toml = Toml::parse("a = 1").unwrap();
		assert_eq!(toml.root().get::<str>("a"), None);
	}
}
