use core::str::FromStr;

use heapless::Vec;

use crate::error::Error;

/// Upper bound on fields in one response; `+QISTATE` is the widest with 10.
pub const MAX_ARGS: usize = 16;

/// Comma separated response fields, e.g. `0,"TCP","1.2.3.4",80`.
///
/// Commas between double quotes do not split. A field that is wrapped in
/// double quotes is returned without them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args<'a> {
    fields: Vec<&'a str, MAX_ARGS>,
}

impl<'a> Args<'a> {
    pub fn parse(s: &'a str) -> Result<Self, Error> {
        let mut fields = Vec::new();

        if s.is_empty() {
            return Ok(Self { fields });
        }

        let mut quoted = false;
        let mut start = 0;
        for (i, b) in s.bytes().enumerate() {
            match b {
                b'"' => quoted = !quoted,
                b',' if !quoted => {
                    fields.push(unquote(&s[start..i])).map_err(|_| Error::Parse)?;
                    start = i + 1;
                }
                _ => {}
            }
        }
        fields.push(unquote(&s[start..])).map_err(|_| Error::Parse)?;

        Ok(Self { fields })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&'a str> {
        self.fields.get(index).copied()
    }

    /// Field `index` parsed as a number.
    pub fn number<T: FromStr>(&self, index: usize) -> Result<T, Error> {
        self.get(index)
            .ok_or(Error::Parse)?
            .trim()
            .parse()
            .map_err(|_| Error::Parse)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.fields.iter().copied()
    }
}

fn unquote(field: &str) -> &str {
    field
        .strip_prefix('"')
        .and_then(|f| f.strip_suffix('"'))
        .unwrap_or(field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_protect_commas() {
        let args = Args::parse(r#""Hello, world",145,"x""#).unwrap();
        assert_eq!(args.len(), 3);
        assert_eq!(args.get(0), Some("Hello, world"));
        assert_eq!(args.get(1), Some("145"));
        assert_eq!(args.get(2), Some("x"));
        assert_eq!(args.get(3), None);
    }

    #[test]
    fn qistate_line() {
        let args =
            Args::parse(r#"1,"TCP","220.180.239.212",8705,65514,2,1,0,0,"usbmodem""#).unwrap();
        assert_eq!(args.len(), 10);
        assert_eq!(args.number::<u8>(0), Ok(1));
        assert_eq!(args.get(2), Some("220.180.239.212"));
        assert_eq!(args.get(9), Some("usbmodem"));
    }

    #[test]
    fn empty_fields_are_kept() {
        let args = Args::parse(r#""","+819012345678",129"#).unwrap();
        assert_eq!(args.iter().collect::<std::vec::Vec<_>>(), ["", "+819012345678", "129"]);

        let args = Args::parse("1,,").unwrap();
        assert_eq!(args.len(), 3);
        assert_eq!(args.get(2), Some(""));

        assert!(Args::parse("").unwrap().is_empty());
    }

    #[test]
    fn numbers() {
        let args = Args::parse("0,200,17").unwrap();
        assert_eq!(args.number::<u16>(1), Ok(200));
        assert_eq!(args.number::<usize>(2), Ok(17));
        assert_eq!(args.number::<usize>(3), Err(Error::Parse));
        assert_eq!(Args::parse("abc").unwrap().number::<u8>(0), Err(Error::Parse));
    }

    #[test]
    fn too_many_fields() {
        assert_eq!(Args::parse(",,,,,,,,,,,,,,,,,"), Err(Error::Parse));
    }
}
