use crate::error::Error;

/// An incremental BEncode writer.
///
/// Dictionary keys must be added in non-decreasing lexicographic order
/// within each open dictionary (a direct requirement of the BEncode
/// grammar, not just a style convention): [`Encoder::add_key`] rejects a
/// key that sorts before the last one added at the same nesting level.
pub struct Encoder {
    buf: Vec<u8>,
    /// One entry per currently-open dictionary; `None` until its first key
    /// is added.
    last_key_stack: Vec<Option<Vec<u8>>>,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    pub fn new() -> Self {
        Encoder {
            buf: Vec::with_capacity(256),
            last_key_stack: Vec::new(),
        }
    }

    pub fn start_dictionary(&mut self) {
        self.buf.push(b'd');
        self.last_key_stack.push(None);
    }

    pub fn end_dictionary(&mut self) -> Result<(), Error> {
        self.last_key_stack
            .pop()
            .ok_or(Error::InvalidArgument("end_dictionary without a matching start_dictionary"))?;
        self.buf.push(b'e');
        Ok(())
    }

    pub fn start_list(&mut self) {
        self.buf.push(b'l');
    }

    pub fn end_list(&mut self) {
        self.buf.push(b'e');
    }

    pub fn add_integer(&mut self, value: i64) {
        self.buf.extend_from_slice(format!("i{}e", value).as_bytes());
    }

    pub fn add_string(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(format!("{}:", bytes.len()).as_bytes());
        self.buf.extend_from_slice(bytes);
    }

    /// Adds a dictionary key. Must be called with the innermost dictionary
    /// open, and with a key that does not sort before the previous key
    /// added at this level.
    pub fn add_key(&mut self, key: &[u8]) -> Result<(), Error> {
        let slot = self
            .last_key_stack
            .last_mut()
            .ok_or(Error::InvalidArgument("add_key called with no open dictionary"))?;
        if let Some(last) = slot {
            if key < last.as_slice() {
                return Err(Error::DictionaryOrderViolation(key.to_vec(), last.clone()));
            }
        }
        *slot = Some(key.to_vec());
        self.add_string(key);
        Ok(())
    }

    /// Convenience for the common `key -> string value` dictionary entry.
    pub fn add_dictionary_string(&mut self, key: &[u8], value: &[u8]) -> Result<(), Error> {
        self.add_key(key)?;
        self.add_string(value);
        Ok(())
    }

    /// Convenience for the common `key -> integer value` dictionary entry.
    pub fn add_dictionary_integer(&mut self, key: &[u8], value: i64) -> Result<(), Error> {
        self.add_key(key)?;
        self.add_integer(value);
        Ok(())
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_flat_dictionary_in_order() {
        let mut e = Encoder::new();
        e.start_dictionary();
        e.add_dictionary_string(b"a", b"bb").unwrap();
        e.add_dictionary_string(b"yy", b"plpl").unwrap();
        e.end_dictionary().unwrap();
        assert_eq!(e.finish(), b"d1:a2:bb2:yy4:plple".to_vec());
    }

    #[test]
    fn encodes_nested_list() {
        let mut e = Encoder::new();
        e.start_dictionary();
        e.add_key(b"q").unwrap();
        e.start_list();
        e.add_string(b"a");
        e.add_string(b"b");
        e.add_string(b"c");
        e.end_list();
        e.end_dictionary().unwrap();
        assert_eq!(e.finish(), b"d1:ql1:a1:b1:cee".to_vec());
    }

    #[test]
    fn out_of_order_key_is_rejected() {
        let mut e = Encoder::new();
        e.start_dictionary();
        e.add_dictionary_string(b"b", b"x").unwrap();
        let err = e.add_dictionary_string(b"a", b"y").unwrap_err();
        assert!(matches!(err, Error::DictionaryOrderViolation(_, _)));
    }

    #[test]
    fn equal_keys_are_allowed_in_sequence() {
        // not a realistic message, but the grammar only forbids keys that
        // sort strictly before the previous one.
        let mut e = Encoder::new();
        e.start_dictionary();
        e.add_key(b"a").unwrap();
        e.add_string(b"1");
        e.add_key(b"a").unwrap();
        e.add_string(b"2");
        e.end_dictionary().unwrap();
        assert_eq!(e.finish(), b"d1:a1:11:a1:2e".to_vec());
    }

    #[test]
    fn nested_dictionaries_track_key_order_independently() {
        let mut e = Encoder::new();
        e.start_dictionary();
        e.add_key(b"outer_z").unwrap();
        e.start_dictionary();
        e.add_dictionary_string(b"a", b"1").unwrap();
        e.add_dictionary_string(b"b", b"2").unwrap();
        e.end_dictionary().unwrap();
        e.end_dictionary().unwrap();
        assert_eq!(e.finish(), b"d7:outer_zd1:a1:11:b1:2ee".to_vec());
    }

    #[test]
    fn integers_encode_with_sign() {
        let mut e = Encoder::new();
        e.add_integer(-7);
        assert_eq!(e.finish(), b"i-7e".to_vec());
    }

    #[test]
    fn end_dictionary_without_start_errors() {
        let mut e = Encoder::new();
        assert!(e.end_dictionary().is_err());
    }
}
