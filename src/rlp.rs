use serde_json::Value;
use thiserror::Error;

/// A decoded RLP item: either a byte string or a list of items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RlpObject {
	Bytes(Vec<u8>),
	List(Vec<RlpObject>),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RlpError {
	#[error("not enough bytes: need {needed} at offset {offset}, have {available}")]
	Truncated {
		offset: usize,
		needed: usize,
		available: usize,
	},
	#[error("{0} trailing byte(s) after RLP object")]
	TrailingBytes(usize),
	#[error("lists nested deeper than {} levels at offset {offset}", MAX_DEPTH)]
	TooDeep { offset: usize },
}

/// Deepest list nesting `decode` accepts.  Decoded objects are walked
/// recursively, so the bound also caps the stack used by `encode`,
/// `to_json` and drop.
pub const MAX_DEPTH: usize = 1024;

impl RlpObject {
	pub fn as_bytes(&self) -> Option<&[u8]> {
		match self {
			Self::Bytes(b) => Some(b),
			Self::List(_) => None,
		}
	}

	pub fn as_list(&self) -> Option<&[RlpObject]> {
		match self {
			Self::Bytes(_) => None,
			Self::List(items) => Some(items),
		}
	}

	/// Render as JSON: byte strings become `0x`-hex, lists become arrays.
	pub fn to_json(&self) -> Value {
		match self {
			Self::Bytes(b) => Value::String(format!("0x{}", hex::encode(b))),
			Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
		}
	}
}

/// Decode exactly one RLP object from `bytes`.
pub fn decode(bytes: &[u8]) -> Result<RlpObject, RlpError> {
	let mut cursor = Cursor {
		buf: bytes,
		pos: 0,
		depth: 0,
	};
	let obj = cursor.item(bytes.len())?;
	match bytes.len() - cursor.pos {
		0 => Ok(obj),
		n => Err(RlpError::TrailingBytes(n)),
	}
}

/// Canonical encoding of `obj`.
pub fn encode(obj: &RlpObject) -> Vec<u8> {
	let mut out = Vec::new();
	encode_into(obj, &mut out);
	out
}

fn encode_into(obj: &RlpObject, out: &mut Vec<u8>) {
	match obj {
		RlpObject::Bytes(b) if b.len() == 1 && b[0] < 0x80 => out.push(b[0]),
		RlpObject::Bytes(b) => {
			write_header(out, 0x80, b.len());
			out.extend_from_slice(b);
		}
		RlpObject::List(items) => {
			let mut payload = Vec::new();
			for item in items {
				encode_into(item, &mut payload);
			}
			write_header(out, 0xc0, payload.len());
			out.extend_from_slice(&payload);
		}
	}
}

fn write_header(out: &mut Vec<u8>, base: u8, len: usize) {
	if len <= 55 {
		out.push(base + len as u8);
		return;
	}
	let be = (len as u64).to_be_bytes();
	let skip = be.iter().take_while(|b| **b == 0).count();
	let len_bytes = &be[skip..];
	out.push(base + 55 + len_bytes.len() as u8);
	out.extend_from_slice(len_bytes);
}

// -- Decoding --

/// Read position over a single input buffer.  Items are never copied
/// until their payload is materialized, so nested lists cost one pass.
struct Cursor<'a> {
	buf: &'a [u8],
	pos: usize,
	depth: usize,
}

impl Cursor<'_> {
	/// Decode one item that must end at or before `limit`.
	fn item(&mut self, limit: usize) -> Result<RlpObject, RlpError> {
		let b = self.take(1, limit)?[0];

		match b {
			0x00..=0x7f => Ok(RlpObject::Bytes(vec![b])),
			0x80..=0xb7 => {
				let len = usize::from(b - 0x80);
				Ok(RlpObject::Bytes(self.take(len, limit)?.to_vec()))
			}
			0xb8..=0xbf => {
				let len = self.length(usize::from(b - 0xb7), limit)?;
				Ok(RlpObject::Bytes(self.take(len, limit)?.to_vec()))
			}
			0xc0..=0xf7 => self.list(usize::from(b - 0xc0), limit),
			0xf8..=0xff => {
				let len = self.length(usize::from(b - 0xf7), limit)?;
				self.list(len, limit)
			}
		}
	}

	fn list(&mut self, len: usize, limit: usize) -> Result<RlpObject, RlpError> {
		self.ensure(len, limit)?;
		if self.depth == MAX_DEPTH {
			return Err(RlpError::TooDeep { offset: self.pos });
		}
		self.depth += 1;
		let end = self.pos + len;
		let mut items = Vec::new();
		while self.pos < end {
			items.push(self.item(end)?);
		}
		self.depth -= 1;
		Ok(RlpObject::List(items))
	}

	/// Read a big-endian length of `size` bytes.
	fn length(&mut self, size: usize, limit: usize) -> Result<usize, RlpError> {
		let offset = self.pos;
		let raw = self.take(size, limit)?;
		let value = raw.iter().fold(0u128, |acc, b| (acc << 8) | u128::from(*b));
		usize::try_from(value).map_err(|_| RlpError::Truncated {
			offset,
			needed: usize::MAX,
			available: limit - offset,
		})
	}

	fn take(&mut self, n: usize, limit: usize) -> Result<&[u8], RlpError> {
		self.ensure(n, limit)?;
		let start = self.pos;
		self.pos += n;
		Ok(&self.buf[start..self.pos])
	}

	fn ensure(&self, n: usize, limit: usize) -> Result<(), RlpError> {
		let available = limit - self.pos;
		if n > available {
			return Err(RlpError::Truncated {
				offset: self.pos,
				needed: n,
				available,
			});
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn bytes(b: &[u8]) -> RlpObject {
		RlpObject::Bytes(b.to_vec())
	}

	fn is_truncated(r: Result<RlpObject, RlpError>) -> bool {
		matches!(r, Err(RlpError::Truncated { .. }))
	}

	/// `levels` lists, each holding only the next, around an empty list.
	/// Built back to front so no recursion is needed.
	fn nested_lists(levels: usize) -> Vec<u8> {
		let mut rev = vec![0xc0];
		let mut header = Vec::new();
		for _ in 1..levels {
			header.clear();
			write_header(&mut header, 0xc0, rev.len());
			rev.extend(header.iter().rev());
		}
		rev.reverse();
		rev
	}

	proptest! {
		#[test]
		fn short_string_with_prefix_decodes_unchanged(s in proptest::collection::vec(any::<u8>(), 0..=55)) {
			let mut buf = vec![0x80 + s.len() as u8];
			buf.extend_from_slice(&s);
			prop_assert_eq!(decode(&buf), Ok(RlpObject::Bytes(s)));
		}
	}

	#[test]
	fn single_byte_is_its_own_payload() {
		assert_eq!(decode(&[0x00]), Ok(bytes(&[0x00])));
		let obj = decode(&[0x7f]).unwrap();
		assert_eq!(obj.as_bytes(), Some(&[0x7f][..]));
		assert!(obj.as_list().is_none());
	}

	#[test]
	fn empty_string_and_empty_list() {
		assert_eq!(decode(&[0x80]), Ok(bytes(&[])));
		assert_eq!(decode(&[0xc0]), Ok(RlpObject::List(vec![])));
	}

	#[test]
	fn long_string() {
		let payload = vec![0xaa; 60];
		let mut buf = vec![0xb8, 60];
		buf.extend_from_slice(&payload);
		assert_eq!(decode(&buf), Ok(RlpObject::Bytes(payload)));
	}

	#[test]
	fn list_of_concatenated_items_keeps_order() {
		// "cat", "dog", 0x01, [] , 60-byte string
		let items = vec![
			bytes(b"cat"),
			bytes(b"dog"),
			bytes(&[0x01]),
			RlpObject::List(vec![]),
			bytes(&[0x42; 60]),
		];
		let mut payload = Vec::new();
		for item in &items {
			payload.extend(encode(item));
		}
		let mut buf = Vec::new();
		write_header(&mut buf, 0xc0, payload.len());
		buf.extend_from_slice(&payload);

		let decoded = decode(&buf).unwrap();
		assert_eq!(decoded.as_list().unwrap().len(), 5);
		assert_eq!(decoded, RlpObject::List(items));
	}

	#[test]
	fn long_list_with_nesting() {
		let inner = RlpObject::List(vec![bytes(b"abc"), RlpObject::List(vec![bytes(&[9])])]);
		let obj = RlpObject::List(vec![inner.clone(); 10]);
		let buf = encode(&obj);
		assert!(buf[0] >= 0xf8, "expected long-list header, got {:#x}", buf[0]);
		assert_eq!(decode(&buf), Ok(obj));
	}

	#[test]
	fn truncated_short_string() {
		assert!(is_truncated(decode(&[0x83, b'a', b'b'])));
	}

	#[test]
	fn truncated_long_string() {
		// declared 60 bytes, only 10 present
		let mut buf = vec![0xb8, 60];
		buf.extend_from_slice(&[0; 10]);
		assert!(is_truncated(decode(&buf)));
		// length-of-length bytes missing
		assert!(is_truncated(decode(&[0xb9, 0x01])));
	}

	#[test]
	fn truncated_short_list() {
		assert!(is_truncated(decode(&[0xc3, 0x01, 0x02])));
	}

	#[test]
	fn truncated_long_list() {
		let mut buf = vec![0xf8, 80];
		buf.extend_from_slice(&[0x01; 40]);
		assert!(is_truncated(decode(&buf)));
		assert!(is_truncated(decode(&[0xfa, 0x00])));
	}

	#[test]
	fn item_overrunning_its_list_is_truncated() {
		// list claims 2 bytes of payload, inner string claims 3
		assert!(is_truncated(decode(&[0xc2, 0x83, b'a', b'b', b'c'])));
	}

	#[test]
	fn empty_input_is_truncated() {
		assert!(is_truncated(decode(&[])));
	}

	#[test]
	fn trailing_bytes_rejected() {
		assert_eq!(decode(&[0x01, 0x02]), Err(RlpError::TrailingBytes(1)));
		assert_eq!(decode(&[0xc1, 0x01, 0xff, 0xff]), Err(RlpError::TrailingBytes(2)));
	}

	#[test]
	fn nesting_up_to_the_limit_decodes() {
		let obj = decode(&nested_lists(MAX_DEPTH)).unwrap();
		let mut depth = 1;
		let mut cur = &obj;
		while let Some([inner]) = cur.as_list() {
			depth += 1;
			cur = inner;
		}
		assert_eq!(depth, MAX_DEPTH);
		assert_eq!(cur, &RlpObject::List(vec![]));
	}

	#[test]
	fn excessive_nesting_is_an_error() {
		assert!(matches!(
			decode(&nested_lists(MAX_DEPTH + 1)),
			Err(RlpError::TooDeep { .. })
		));
		assert!(matches!(
			decode(&nested_lists(100_000)),
			Err(RlpError::TooDeep { .. })
		));
	}

	#[test]
	fn json_rendering() {
		let obj = RlpObject::List(vec![bytes(&[0xde, 0xad]), RlpObject::List(vec![])]);
		assert_eq!(obj.to_json(), serde_json::json!(["0xdead", []]));
	}
}
