//! OpenURL links into the ILLiad document delivery form

use url::form_urlencoded;

use crate::config::IlliadConfig;
use crate::models::BibliographicRecord;

/// Author name split into OpenURL parts
#[derive(Debug, Default, PartialEq, Eq)]
struct AuthorParts {
    last: String,
    first: String,
    initial: String,
}

fn author_parts(bib: &BibliographicRecord) -> AuthorParts {
    let main = if bib.author.is_empty() {
        bib.authors.first().map(String::as_str).unwrap_or_default()
    } else {
        bib.author.as_str()
    };

    match main.split_once(',') {
        Some((last, first)) => {
            let first = first.trim().trim_end_matches('.').trim();
            AuthorParts {
                last: last.trim().to_string(),
                first: first.to_string(),
                initial: first.chars().next().map(String::from).unwrap_or_default(),
            }
        }
        None => AuthorParts {
            last: main.trim().to_string(),
            ..Default::default()
        },
    }
}

/// Title proper, without the statement of responsibility
fn short_title(title: &str) -> &str {
    title.split('/').next().unwrap_or_default().trim()
}

/// OCLC number without its `(OCoLC)` style prefix
fn bare_oclc(oclc: &str) -> &str {
    match oclc.find(')') {
        Some(idx) => oclc[idx + 1..].trim(),
        None => oclc.trim(),
    }
}

/// Build the document request URL for a bib. Fields absent from the record
/// are left out of the query string.
pub fn document_request_url(config: &IlliadConfig, bib: &BibliographicRecord) -> String {
    let author = author_parts(bib);

    let params = [
        ("rft.genre", bib.bib_format.as_str()),
        ("rft.aulast", author.last.as_str()),
        ("rft.aufirst", author.first.as_str()),
        ("rft.auinit", author.initial.as_str()),
        ("rft.pub", bib.publisher.as_str()),
        ("rft.isbn", bib.isbn.as_str()),
        ("rft.place", bib.pub_place.as_str()),
        ("rft.oclcnum", bare_oclc(&bib.oclc)),
        ("rft.date", bib.publisher_date.as_str()),
        ("rft.btitle", short_title(&bib.title)),
    ];

    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("linktype", "openurl");
    for (name, value) in params.iter().filter(|(_, value)| !value.is_empty()) {
        query.append_pair(name, value);
    }
    query.append_pair("rfr_id", &format!("info:sid/{}", config.sid));

    let separator = if config.url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", config.url, separator, query.finish())
}
