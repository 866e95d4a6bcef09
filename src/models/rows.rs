//! Row types returned by the catalog query gateway.
//!
//! Every row is right-trimmed before it leaves the repository.

use chrono::NaiveDateTime;
use sqlx::FromRow;

/// Right-trim every string value of a row
pub trait RightTrim {
    fn right_trimmed(self) -> Self;
}

impl RightTrim for String {
    fn right_trimmed(mut self) -> Self {
        let len = self.trim_end().len();
        self.truncate(len);
        self
    }
}

impl RightTrim for Option<String> {
    fn right_trimmed(self) -> Self {
        self.map(RightTrim::right_trimmed)
    }
}

macro_rules! right_trim_fields {
    ($row:ty { $($field:ident),* $(,)? }) => {
        impl RightTrim for $row {
            fn right_trimmed(mut self) -> Self {
                $(self.$field = self.$field.right_trimmed();)*
                self
            }
        }
    };
}

/// Core bibliographic text of one bib
#[derive(Debug, Clone, Default, FromRow)]
pub struct BibTextRow {
    pub bib_id: i32,
    pub title: Option<String>,
    pub author: Option<String>,
    pub edition: Option<String>,
    pub isbn: Option<String>,
    pub issn: Option<String>,
    pub oclc: Option<String>,
    pub publisher: Option<String>,
    pub pub_place: Option<String>,
    pub imprint: Option<String>,
    pub bib_format: Option<String>,
    pub language: Option<String>,
    pub library_name: String,
    pub publisher_date: Option<String>,
    pub link: Option<String>,
    pub cjk_info: Option<String>,
    pub message: Option<String>,
}

right_trim_fields!(BibTextRow {
    title, author, edition, isbn, issn, oclc, publisher, pub_place, imprint,
    bib_format, language, library_name, publisher_date, link, cjk_info, message,
});

/// Normal and display heading of an inverted-index entry
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow)]
pub struct IndexHeadingRow {
    pub normal_heading: String,
    pub display_heading: String,
}

right_trim_fields!(IndexHeadingRow { normal_heading, display_heading });

/// A bib found through the inverted index, with its owning library
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow)]
pub struct IndexedBibRow {
    pub bib_id: i32,
    pub display_heading: String,
    pub library_name: String,
}

right_trim_fields!(IndexedBibRow { display_heading, library_name });

/// One MFHD attached to a bib
#[derive(Debug, Clone, Default, FromRow)]
pub struct HoldingRow {
    pub bib_id: i32,
    pub mfhd_id: i32,
    pub location_id: i32,
    pub display_call_no: Option<String>,
    pub location_display_name: Option<String>,
    pub library_name: String,
}

right_trim_fields!(HoldingRow { display_call_no, location_display_name, library_name });

/// Concatenated 852/856/866 tag text of one MFHD
#[derive(Debug, Clone, Default, FromRow)]
pub struct MfhdTextRow {
    pub marc852: Option<String>,
    pub marc856: Option<String>,
    pub marc866: Option<String>,
}

right_trim_fields!(MfhdTextRow { marc852, marc856, marc866 });

/// Individual MFHD subfields
#[derive(Debug, Clone, Default, FromRow)]
pub struct ElectronicRow {
    pub mfhd_id: i32,
    pub link856u: Option<String>,
    pub link856z: Option<String>,
    pub link852z: Option<String>,
    pub link852a: Option<String>,
    pub link852h: Option<String>,
    pub link866: Option<String>,
    pub link8563: Option<String>,
}

right_trim_fields!(ElectronicRow {
    link856u, link856z, link852z, link852a, link852h, link866, link8563,
});

/// Item, status and location join for one MFHD
#[derive(Debug, Clone, Default, FromRow)]
pub struct ItemRow {
    pub display_call_no: Option<String>,
    pub item_status_desc: Option<String>,
    pub item_status: i32,
    pub perm_location: Option<String>,
    pub temp_location: Option<String>,
    pub item_enum: Option<String>,
    pub chron: Option<String>,
    pub item_id: i32,
    pub item_status_date: Option<NaiveDateTime>,
    pub bib_id: i32,
}

right_trim_fields!(ItemRow {
    display_call_no, item_status_desc, perm_location, temp_location, item_enum, chron,
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_right_trim_row() {
        let row = HoldingRow {
            display_call_no: Some("QA76.73 .R87  ".to_string()),
            location_display_name: None,
            library_name: "GW   ".to_string(),
            ..Default::default()
        }
        .right_trimmed();
        assert_eq!(row.display_call_no.as_deref(), Some("QA76.73 .R87"));
        assert_eq!(row.location_display_name, None);
        assert_eq!(row.library_name, "GW");
    }

    #[test]
    fn test_right_trim_keeps_leading_space() {
        assert_eq!("  stacks \n".to_string().right_trimmed(), "  stacks");
    }
}
