//! Body serialization for audit lines.
//!
//! Two tiers: a strict serde_json pass first, then the [`relaxed`] fallback
//! for payloads the strict pass rejects. Raw transport bytes go through
//! [`render_bytes`], which leaves plain text untouched and never fails.

use serde::Serialize;

/// Serialize a payload for an audit line.
///
/// The strict pass handles the common case; when it reports an error the
/// relaxed fallback takes over. An error from the fallback itself is
/// surfaced so the logging routine's catch boundary can report it.
pub fn body_to_string<T>(value: &T) -> Result<String, relaxed::Error>
where
    T: Serialize + ?Sized,
{
    match serde_json::to_string(value) {
        Ok(rendered) => Ok(rendered),
        Err(_) => relaxed::to_string(value),
    }
}

/// Like [`body_to_string`], but an absent payload renders as the empty
/// string rather than a `null` token.
pub fn opt_body_to_string<T>(value: Option<&T>) -> Result<String, relaxed::Error>
where
    T: Serialize + ?Sized,
{
    match value {
        Some(value) => body_to_string(value),
        None => Ok(String::new()),
    }
}

/// Render captured transport bytes for an audit line.
///
/// Empty input renders as the empty string. UTF-8 JSON is re-serialized
/// compactly; other UTF-8 text is already textual and returned unchanged;
/// binary payloads get a size placeholder.
pub fn render_bytes(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return String::new();
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => match serde_json::from_str::<serde_json::Value>(text) {
            Ok(json) => serde_json::to_string(&json).unwrap_or_else(|_| text.to_string()),
            Err(_) => text.to_string(),
        },
        Err(_) => format!("[binary: {} bytes]", bytes.len()),
    }
}

/// Permissive JSON rendering used when the strict pass fails.
///
/// Differences from strict serde_json: map keys of any shape are accepted
/// (scalars are coerced to their plain rendering, compound keys to their
/// JSON text), non-finite floats become `null`, null fields stay explicit,
/// field names pass through unmodified, and nothing is HTML-escaped.
pub mod relaxed {
    use std::fmt::Write as _;

    use serde::ser::{self, Impossible, Serialize};
    use thiserror::Error;

    /// Failure the relaxed pass still cannot absorb: in practice a
    /// `Serialize` implementation reporting its own error.
    #[derive(Debug, Error)]
    #[error("{0}")]
    pub struct Error(String);

    impl ser::Error for Error {
        fn custom<T: std::fmt::Display>(msg: T) -> Self {
            Error(msg.to_string())
        }
    }

    /// Render any `Serialize` value to compact JSON.
    pub fn to_string<T>(value: &T) -> Result<String, Error>
    where
        T: Serialize + ?Sized,
    {
        let mut out = String::new();
        value.serialize(Serializer { out: &mut out })?;
        Ok(out)
    }

    struct Serializer<'a> {
        out: &'a mut String,
    }

    fn write_escaped(out: &mut String, value: &str) {
        out.push('"');
        for ch in value.chars() {
            match ch {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                ch if (ch as u32) < 0x20 => {
                    let _ = write!(out, "\\u{:04x}", ch as u32);
                }
                ch => out.push(ch),
            }
        }
        out.push('"');
    }

    impl<'a> ser::Serializer for Serializer<'a> {
        type Ok = ();
        type Error = Error;
        type SerializeSeq = Compound<'a>;
        type SerializeTuple = Compound<'a>;
        type SerializeTupleStruct = Compound<'a>;
        type SerializeTupleVariant = Compound<'a>;
        type SerializeMap = Compound<'a>;
        type SerializeStruct = Compound<'a>;
        type SerializeStructVariant = Compound<'a>;

        fn serialize_bool(self, v: bool) -> Result<(), Error> {
            self.out.push_str(if v { "true" } else { "false" });
            Ok(())
        }

        fn serialize_i8(self, v: i8) -> Result<(), Error> {
            self.serialize_i64(i64::from(v))
        }

        fn serialize_i16(self, v: i16) -> Result<(), Error> {
            self.serialize_i64(i64::from(v))
        }

        fn serialize_i32(self, v: i32) -> Result<(), Error> {
            self.serialize_i64(i64::from(v))
        }

        fn serialize_i64(self, v: i64) -> Result<(), Error> {
            let _ = write!(self.out, "{v}");
            Ok(())
        }

        fn serialize_i128(self, v: i128) -> Result<(), Error> {
            let _ = write!(self.out, "{v}");
            Ok(())
        }

        fn serialize_u8(self, v: u8) -> Result<(), Error> {
            self.serialize_u64(u64::from(v))
        }

        fn serialize_u16(self, v: u16) -> Result<(), Error> {
            self.serialize_u64(u64::from(v))
        }

        fn serialize_u32(self, v: u32) -> Result<(), Error> {
            self.serialize_u64(u64::from(v))
        }

        fn serialize_u64(self, v: u64) -> Result<(), Error> {
            let _ = write!(self.out, "{v}");
            Ok(())
        }

        fn serialize_u128(self, v: u128) -> Result<(), Error> {
            let _ = write!(self.out, "{v}");
            Ok(())
        }

        fn serialize_f32(self, v: f32) -> Result<(), Error> {
            self.serialize_f64(f64::from(v))
        }

        fn serialize_f64(self, v: f64) -> Result<(), Error> {
            if v.is_finite() {
                let _ = write!(self.out, "{v}");
            } else {
                self.out.push_str("null");
            }
            Ok(())
        }

        fn serialize_char(self, v: char) -> Result<(), Error> {
            write_escaped(self.out, v.encode_utf8(&mut [0u8; 4]));
            Ok(())
        }

        fn serialize_str(self, v: &str) -> Result<(), Error> {
            write_escaped(self.out, v);
            Ok(())
        }

        fn serialize_bytes(self, v: &[u8]) -> Result<(), Error> {
            let mut seq = self.serialize_seq(Some(v.len()))?;
            for byte in v {
                ser::SerializeSeq::serialize_element(&mut seq, byte)?;
            }
            ser::SerializeSeq::end(seq)
        }

        fn serialize_none(self) -> Result<(), Error> {
            self.out.push_str("null");
            Ok(())
        }

        fn serialize_some<T>(self, value: &T) -> Result<(), Error>
        where
            T: Serialize + ?Sized,
        {
            value.serialize(self)
        }

        fn serialize_unit(self) -> Result<(), Error> {
            self.out.push_str("null");
            Ok(())
        }

        fn serialize_unit_struct(self, _name: &'static str) -> Result<(), Error> {
            self.serialize_unit()
        }

        fn serialize_unit_variant(
            self,
            _name: &'static str,
            _index: u32,
            variant: &'static str,
        ) -> Result<(), Error> {
            self.serialize_str(variant)
        }

        fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<(), Error>
        where
            T: Serialize + ?Sized,
        {
            value.serialize(self)
        }

        fn serialize_newtype_variant<T>(
            self,
            _name: &'static str,
            _index: u32,
            variant: &'static str,
            value: &T,
        ) -> Result<(), Error>
        where
            T: Serialize + ?Sized,
        {
            self.out.push('{');
            write_escaped(self.out, variant);
            self.out.push(':');
            value.serialize(Serializer { out: &mut *self.out })?;
            self.out.push('}');
            Ok(())
        }

        fn serialize_seq(self, _len: Option<usize>) -> Result<Compound<'a>, Error> {
            self.out.push('[');
            Ok(Compound {
                out: self.out,
                first: true,
                closer: "]",
            })
        }

        fn serialize_tuple(self, len: usize) -> Result<Compound<'a>, Error> {
            self.serialize_seq(Some(len))
        }

        fn serialize_tuple_struct(
            self,
            _name: &'static str,
            len: usize,
        ) -> Result<Compound<'a>, Error> {
            self.serialize_seq(Some(len))
        }

        fn serialize_tuple_variant(
            self,
            _name: &'static str,
            _index: u32,
            variant: &'static str,
            _len: usize,
        ) -> Result<Compound<'a>, Error> {
            self.out.push('{');
            write_escaped(self.out, variant);
            self.out.push_str(":[");
            Ok(Compound {
                out: self.out,
                first: true,
                closer: "]}",
            })
        }

        fn serialize_map(self, _len: Option<usize>) -> Result<Compound<'a>, Error> {
            self.out.push('{');
            Ok(Compound {
                out: self.out,
                first: true,
                closer: "}",
            })
        }

        fn serialize_struct(self, _name: &'static str, len: usize) -> Result<Compound<'a>, Error> {
            self.serialize_map(Some(len))
        }

        fn serialize_struct_variant(
            self,
            _name: &'static str,
            _index: u32,
            variant: &'static str,
            _len: usize,
        ) -> Result<Compound<'a>, Error> {
            self.out.push('{');
            write_escaped(self.out, variant);
            self.out.push_str(":{");
            Ok(Compound {
                out: self.out,
                first: true,
                closer: "}}",
            })
        }
    }

    struct Compound<'a> {
        out: &'a mut String,
        first: bool,
        closer: &'static str,
    }

    impl Compound<'_> {
        fn sep(&mut self) {
            if self.first {
                self.first = false;
            } else {
                self.out.push(',');
            }
        }
    }

    impl ser::SerializeSeq for Compound<'_> {
        type Ok = ();
        type Error = Error;

        fn serialize_element<T>(&mut self, value: &T) -> Result<(), Error>
        where
            T: Serialize + ?Sized,
        {
            self.sep();
            value.serialize(Serializer { out: &mut *self.out })
        }

        fn end(self) -> Result<(), Error> {
            self.out.push_str(self.closer);
            Ok(())
        }
    }

    impl ser::SerializeTuple for Compound<'_> {
        type Ok = ();
        type Error = Error;

        fn serialize_element<T>(&mut self, value: &T) -> Result<(), Error>
        where
            T: Serialize + ?Sized,
        {
            ser::SerializeSeq::serialize_element(self, value)
        }

        fn end(self) -> Result<(), Error> {
            ser::SerializeSeq::end(self)
        }
    }

    impl ser::SerializeTupleStruct for Compound<'_> {
        type Ok = ();
        type Error = Error;

        fn serialize_field<T>(&mut self, value: &T) -> Result<(), Error>
        where
            T: Serialize + ?Sized,
        {
            ser::SerializeSeq::serialize_element(self, value)
        }

        fn end(self) -> Result<(), Error> {
            ser::SerializeSeq::end(self)
        }
    }

    impl ser::SerializeTupleVariant for Compound<'_> {
        type Ok = ();
        type Error = Error;

        fn serialize_field<T>(&mut self, value: &T) -> Result<(), Error>
        where
            T: Serialize + ?Sized,
        {
            ser::SerializeSeq::serialize_element(self, value)
        }

        fn end(self) -> Result<(), Error> {
            ser::SerializeSeq::end(self)
        }
    }

    impl ser::SerializeMap for Compound<'_> {
        type Ok = ();
        type Error = Error;

        fn serialize_key<T>(&mut self, key: &T) -> Result<(), Error>
        where
            T: Serialize + ?Sized,
        {
            self.sep();
            let text = key_text(key)?;
            write_escaped(self.out, &text);
            self.out.push(':');
            Ok(())
        }

        fn serialize_value<T>(&mut self, value: &T) -> Result<(), Error>
        where
            T: Serialize + ?Sized,
        {
            value.serialize(Serializer { out: &mut *self.out })
        }

        fn end(self) -> Result<(), Error> {
            self.out.push_str(self.closer);
            Ok(())
        }
    }

    impl ser::SerializeStruct for Compound<'_> {
        type Ok = ();
        type Error = Error;

        fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), Error>
        where
            T: Serialize + ?Sized,
        {
            self.sep();
            write_escaped(self.out, key);
            self.out.push(':');
            value.serialize(Serializer { out: &mut *self.out })
        }

        fn end(self) -> Result<(), Error> {
            self.out.push_str(self.closer);
            Ok(())
        }
    }

    impl ser::SerializeStructVariant for Compound<'_> {
        type Ok = ();
        type Error = Error;

        fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), Error>
        where
            T: Serialize + ?Sized,
        {
            ser::SerializeStruct::serialize_field(self, key, value)
        }

        fn end(self) -> Result<(), Error> {
            ser::SerializeStruct::end(self)
        }
    }

    /// Render a map key as plain text: scalars as their unquoted rendering,
    /// anything compound as its JSON text.
    fn key_text<T>(key: &T) -> Result<String, Error>
    where
        T: Serialize + ?Sized,
    {
        match key.serialize(ScalarKeySerializer) {
            Ok(text) => Ok(text),
            Err(KeyError::NotScalar) => to_string(key),
            Err(KeyError::Custom(msg)) => Err(Error(msg)),
        }
    }

    #[derive(Debug)]
    enum KeyError {
        NotScalar,
        Custom(String),
    }

    impl std::fmt::Display for KeyError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                KeyError::NotScalar => f.write_str("map key is not a scalar"),
                KeyError::Custom(msg) => f.write_str(msg),
            }
        }
    }

    impl std::error::Error for KeyError {}

    impl ser::Error for KeyError {
        fn custom<T: std::fmt::Display>(msg: T) -> Self {
            KeyError::Custom(msg.to_string())
        }
    }

    struct ScalarKeySerializer;

    impl ser::Serializer for ScalarKeySerializer {
        type Ok = String;
        type Error = KeyError;
        type SerializeSeq = Impossible<String, KeyError>;
        type SerializeTuple = Impossible<String, KeyError>;
        type SerializeTupleStruct = Impossible<String, KeyError>;
        type SerializeTupleVariant = Impossible<String, KeyError>;
        type SerializeMap = Impossible<String, KeyError>;
        type SerializeStruct = Impossible<String, KeyError>;
        type SerializeStructVariant = Impossible<String, KeyError>;

        fn serialize_bool(self, v: bool) -> Result<String, KeyError> {
            Ok(v.to_string())
        }

        fn serialize_i8(self, v: i8) -> Result<String, KeyError> {
            Ok(v.to_string())
        }

        fn serialize_i16(self, v: i16) -> Result<String, KeyError> {
            Ok(v.to_string())
        }

        fn serialize_i32(self, v: i32) -> Result<String, KeyError> {
            Ok(v.to_string())
        }

        fn serialize_i64(self, v: i64) -> Result<String, KeyError> {
            Ok(v.to_string())
        }

        fn serialize_i128(self, v: i128) -> Result<String, KeyError> {
            Ok(v.to_string())
        }

        fn serialize_u8(self, v: u8) -> Result<String, KeyError> {
            Ok(v.to_string())
        }

        fn serialize_u16(self, v: u16) -> Result<String, KeyError> {
            Ok(v.to_string())
        }

        fn serialize_u32(self, v: u32) -> Result<String, KeyError> {
            Ok(v.to_string())
        }

        fn serialize_u64(self, v: u64) -> Result<String, KeyError> {
            Ok(v.to_string())
        }

        fn serialize_u128(self, v: u128) -> Result<String, KeyError> {
            Ok(v.to_string())
        }

        fn serialize_f32(self, v: f32) -> Result<String, KeyError> {
            self.serialize_f64(f64::from(v))
        }

        fn serialize_f64(self, v: f64) -> Result<String, KeyError> {
            Ok(if v.is_finite() {
                v.to_string()
            } else {
                "null".to_string()
            })
        }

        fn serialize_char(self, v: char) -> Result<String, KeyError> {
            Ok(v.to_string())
        }

        fn serialize_str(self, v: &str) -> Result<String, KeyError> {
            Ok(v.to_string())
        }

        fn serialize_bytes(self, _v: &[u8]) -> Result<String, KeyError> {
            Err(KeyError::NotScalar)
        }

        fn serialize_none(self) -> Result<String, KeyError> {
            Ok("null".to_string())
        }

        fn serialize_some<T>(self, value: &T) -> Result<String, KeyError>
        where
            T: Serialize + ?Sized,
        {
            value.serialize(self)
        }

        fn serialize_unit(self) -> Result<String, KeyError> {
            Ok("null".to_string())
        }

        fn serialize_unit_struct(self, _name: &'static str) -> Result<String, KeyError> {
            Ok("null".to_string())
        }

        fn serialize_unit_variant(
            self,
            _name: &'static str,
            _index: u32,
            variant: &'static str,
        ) -> Result<String, KeyError> {
            Ok(variant.to_string())
        }

        fn serialize_newtype_struct<T>(
            self,
            _name: &'static str,
            value: &T,
        ) -> Result<String, KeyError>
        where
            T: Serialize + ?Sized,
        {
            value.serialize(self)
        }

        fn serialize_newtype_variant<T>(
            self,
            _name: &'static str,
            _index: u32,
            _variant: &'static str,
            _value: &T,
        ) -> Result<String, KeyError>
        where
            T: Serialize + ?Sized,
        {
            Err(KeyError::NotScalar)
        }

        fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, KeyError> {
            Err(KeyError::NotScalar)
        }

        fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, KeyError> {
            Err(KeyError::NotScalar)
        }

        fn serialize_tuple_struct(
            self,
            _name: &'static str,
            _len: usize,
        ) -> Result<Self::SerializeTupleStruct, KeyError> {
            Err(KeyError::NotScalar)
        }

        fn serialize_tuple_variant(
            self,
            _name: &'static str,
            _index: u32,
            _variant: &'static str,
            _len: usize,
        ) -> Result<Self::SerializeTupleVariant, KeyError> {
            Err(KeyError::NotScalar)
        }

        fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, KeyError> {
            Err(KeyError::NotScalar)
        }

        fn serialize_struct(
            self,
            _name: &'static str,
            _len: usize,
        ) -> Result<Self::SerializeStruct, KeyError> {
            Err(KeyError::NotScalar)
        }

        fn serialize_struct_variant(
            self,
            _name: &'static str,
            _index: u32,
            _variant: &'static str,
            _len: usize,
        ) -> Result<Self::SerializeStructVariant, KeyError> {
            Err(KeyError::NotScalar)
        }
    }
}
