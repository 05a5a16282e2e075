use super::linkage::FieldLink;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subfield {
    pub code: char,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlField {
    pub tag: String,
    pub value: String,
}

/// A variable data field: tag, two indicators and ordered subfields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataField {
    pub tag: String,
    pub ind1: char,
    pub ind2: char,
    pub subfields: Vec<Subfield>,
}

impl DataField {
    pub fn new(tag: impl Into<String>, ind1: char, ind2: char) -> Self {
        Self {
            tag: tag.into(),
            ind1,
            ind2,
            subfields: Vec::new(),
        }
    }

    pub fn with_subfield(mut self, code: char, value: impl Into<String>) -> Self {
        self.subfields.push(Subfield {
            code,
            value: value.into(),
        });
        self
    }

    /// Tag followed by both indicators, blanks rendered as `_` (e.g. `2451_`)
    pub fn dispatch_key(&self) -> String {
        let blank = |c: char| if c == ' ' { '_' } else { c };
        format!("{}{}{}", self.tag, blank(self.ind1), blank(self.ind2))
    }

    pub fn first(&self, code: char) -> Option<&str> {
        self.values(code).next()
    }

    pub fn values(&self, code: char) -> impl Iterator<Item = &str> + '_ {
        self.subfields
            .iter()
            .filter(move |s| s.code == code)
            .map(|s| s.value.as_str())
    }

    /// The `nth` occurrence (0-based) of a subfield code
    pub fn nth(&self, code: char, n: usize) -> Option<&str> {
        self.values(code).nth(n)
    }

    /// Linkage carried in `$6`, if any
    pub fn link(&self) -> Option<FieldLink> {
        self.first('6').and_then(FieldLink::parse)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Control(ControlField),
    Data(DataField),
}

impl Field {
    pub fn tag(&self) -> &str {
        match self {
            Field::Control(f) => &f.tag,
            Field::Data(f) => &f.tag,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarcRecord {
    pub leader: String,
    pub fields: Vec<Field>,
}

impl MarcRecord {
    pub fn new(leader: impl Into<String>) -> Self {
        Self {
            leader: leader.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_control(mut self, tag: &str, value: impl Into<String>) -> Self {
        self.fields.push(Field::Control(ControlField {
            tag: tag.to_string(),
            value: value.into(),
        }));
        self
    }

    pub fn with_field(mut self, field: DataField) -> Self {
        self.fields.push(Field::Data(field));
        self
    }

    pub fn control(&self, tag: &str) -> Option<&str> {
        self.fields.iter().find_map(|f| match f {
            Field::Control(c) if c.tag == tag => Some(c.value.as_str()),
            _ => None,
        })
    }

    pub fn data_fields<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a DataField> + 'a {
        self.fields.iter().filter_map(move |f| match f {
            Field::Data(d) if d.tag == tag => Some(d),
            _ => None,
        })
    }

    /// Fixed-length data elements from the `008` control field
    pub fn fixed_data(&self) -> FixedData<'_> {
        FixedData {
            value: self.control("008").unwrap_or_default(),
        }
    }
}

/// Positional view over the `008` field.
///
/// Every accessor returns `None` when the field is too short for the
/// requested position.
#[derive(Debug, Clone, Copy)]
pub struct FixedData<'a> {
    value: &'a str,
}

impl<'a> FixedData<'a> {
    /// Minimum length for the language code at positions 35-37 to be read
    pub const LANGUAGE_MIN_LEN: usize = 39;

    pub fn new(value: &'a str) -> Self {
        Self { value }
    }

    fn slice(&self, start: usize, end: usize) -> Option<&'a str> {
        self.value.get(start..end)
    }

    pub fn date_type(&self) -> Option<char> {
        self.slice(6, 7).and_then(|s| s.chars().next())
    }

    pub fn date1(&self) -> Option<&'a str> {
        self.slice(7, 11)
    }

    pub fn date2(&self) -> Option<&'a str> {
        self.slice(11, 15)
    }

    pub fn country(&self) -> Option<&'a str> {
        self.slice(15, 18)
    }

    pub fn language(&self) -> Option<&'a str> {
        if self.value.len() < Self::LANGUAGE_MIN_LEN {
            return None;
        }
        self.slice(35, 38)
    }
}
