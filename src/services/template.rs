//! Destination naming templates
//!
//! A template is compiled once into an ordered list of literal and variable
//! segments, then applied per source file. Variable syntax follows
//! `<var>`, `<var+suffix>` and `<prefix+var+suffix>`: the prefix/suffix
//! literals are emitted only when the variable resolves to a non-empty value,
//! so segments like `< - +album+>` vanish for untagged files. Literal angle
//! brackets cannot appear in templates.

use std::fmt;
use std::path::Path;

use thiserror::Error;

use super::file_types::normalized_extension;
use crate::types::TagMetadata;

/// Template compile errors, reported upfront before any job is scheduled
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Variable name is not in the supported vocabulary
    #[error("Unknown template variable: <{0}>")]
    UnknownVariable(String),

    /// A `<` group is never closed
    #[error("Unterminated variable expression in template")]
    UnterminatedGroup,

    /// A `<` appears inside a variable expression
    #[error("Nested '<' inside variable expression")]
    NestedDelimiter,

    /// More than prefix+var+suffix inside one expression
    #[error("Illegal number of elements in expression \"<{0}>\"")]
    TooManyParts(String),
}

/// Supported template variables (closed vocabulary)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateVar {
    Artist,
    Album,
    AlbumArtist,
    AlbumArtistOrArtist,
    Title,
    Track,
    TrackTotal,
    DiscNumber,
    Genre,
    Date,
    Filename,
    FilenameNoExt,
    ParentDirBasename,
    Ext,
    PlaylistName,
    PlaylistFileNumber,
    PlaylistTotalFiles,
}

impl TemplateVar {
    /// Parse a variable name, accepting the short aliases.
    fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "a" | "artist" => Some(Self::Artist),
            "b" | "album" => Some(Self::Album),
            "aa" | "albumartist" => Some(Self::AlbumArtist),
            "aaa" | "albumartist_or_artist" => Some(Self::AlbumArtistOrArtist),
            "t" | "title" => Some(Self::Title),
            "tn" | "track" | "tracknumber" => Some(Self::Track),
            "tt" | "tracktotal" => Some(Self::TrackTotal),
            "dn" | "discnumber" => Some(Self::DiscNumber),
            "genre" => Some(Self::Genre),
            "date" => Some(Self::Date),
            "filename" => Some(Self::Filename),
            "filename_noext" => Some(Self::FilenameNoExt),
            "parentdir_basename" => Some(Self::ParentDirBasename),
            "ext" => Some(Self::Ext),
            "playlist_name" => Some(Self::PlaylistName),
            "playlist_filenumber" => Some(Self::PlaylistFileNumber),
            "playlist_totalfiles" => Some(Self::PlaylistTotalFiles),
            _ => None,
        }
    }
}

/// Playlist position context for playlist-scoped naming
#[derive(Debug, Clone)]
pub struct PlaylistContext {
    pub name: String,
    /// 1-based position within the playlist
    pub number: usize,
    /// Total playlist entries, controls zero-pad width
    pub total: usize,
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Group {
        prefix: String,
        var: TemplateVar,
        suffix: String,
    },
}

/// A compiled naming template; stateless and reentrant
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Compile a template string, validating syntax and variable names.
    pub fn compile(input: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = input.chars();

        while let Some(c) = chars.next() {
            if c != '<' {
                literal.push(c);
                continue;
            }
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }

            let mut body = String::new();
            loop {
                match chars.next() {
                    Some('>') => break,
                    Some('<') => return Err(TemplateError::NestedDelimiter),
                    Some(c) => body.push(c),
                    None => return Err(TemplateError::UnterminatedGroup),
                }
            }
            // "<>" expands to nothing
            if body.is_empty() {
                continue;
            }
            segments.push(parse_group(&body)?);
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: input.to_string(),
            segments,
        })
    }

    /// Expand the template for one source file.
    ///
    /// Pure: same inputs always yield the same output. Playlist variables
    /// resolve empty (dropping their whole group) outside playlist context.
    /// Slashes inside resolved values become dashes so tag values cannot
    /// introduce directory levels.
    pub fn apply(
        &self,
        tags: &TagMetadata,
        source: &Path,
        playlist: Option<&PlaylistContext>,
    ) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Group {
                    prefix,
                    var,
                    suffix,
                } => {
                    if let Some(value) = resolve(*var, tags, source, playlist) {
                        out.push_str(prefix);
                        out.push_str(&value.replace('/', "-"));
                        out.push_str(suffix);
                    }
                }
            }
        }
        out
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_group(body: &str) -> Result<Segment, TemplateError> {
    let parts: Vec<&str> = body.split('+').collect();
    let (prefix, name, suffix) = match parts.as_slice() {
        [name] => ("", *name, ""),
        [name, suffix] => ("", *name, *suffix),
        [prefix, name, suffix] => (*prefix, *name, *suffix),
        _ => return Err(TemplateError::TooManyParts(body.to_string())),
    };
    let var = TemplateVar::parse(name)
        .ok_or_else(|| TemplateError::UnknownVariable(name.to_string()))?;
    Ok(Segment::Group {
        prefix: prefix.to_string(),
        var,
        suffix: suffix.to_string(),
    })
}

fn resolve(
    var: TemplateVar,
    tags: &TagMetadata,
    source: &Path,
    playlist: Option<&PlaylistContext>,
) -> Option<String> {
    let value = match var {
        TemplateVar::Artist => tags.artist.clone(),
        TemplateVar::Album => tags.album.clone(),
        TemplateVar::AlbumArtist => tags.albumartist.clone(),
        TemplateVar::AlbumArtistOrArtist => tags.albumartist.clone().or_else(|| tags.artist.clone()),
        TemplateVar::Title => tags.title.clone(),
        TemplateVar::Track => tags.track.map(|n| zeropad(n as usize, 2)),
        TemplateVar::TrackTotal => tags.tracktotal.map(|n| zeropad(n as usize, 2)),
        TemplateVar::DiscNumber => tags.discnumber.map(|n| zeropad(n as usize, 2)),
        TemplateVar::Genre => tags.genre.clone(),
        TemplateVar::Date => tags.date.clone(),
        TemplateVar::Filename => source
            .file_name()
            .map(|n| n.to_string_lossy().to_string()),
        TemplateVar::FilenameNoExt => source
            .file_stem()
            .map(|n| n.to_string_lossy().to_string()),
        TemplateVar::ParentDirBasename => source
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string()),
        TemplateVar::Ext => normalized_extension(source),
        TemplateVar::PlaylistName => playlist.map(|c| c.name.clone()),
        TemplateVar::PlaylistFileNumber => {
            playlist.map(|c| zeropad(c.number, c.total.to_string().len()))
        }
        TemplateVar::PlaylistTotalFiles => playlist.map(|c| c.total.to_string()),
    };
    value.filter(|v| !v.is_empty())
}

fn zeropad(n: usize, width: usize) -> String {
    format!("{:0width$}", n)
}

/// Remove filesystem-unsafe characters and normalize a relative path.
///
/// Applied to the whole expanded template output: unsafe characters are
/// stripped, quoting characters become apostrophes, whitespace runs collapse,
/// components lose surrounding dots and spaces and are capped at 200
/// characters, and empty components are dropped. A final component that
/// cleans away entirely is kept as a trailing `/` so the caller can detect a
/// name that never materialized.
pub fn sanitize_path(raw: &str) -> String {
    let substituted: String = raw
        .chars()
        .filter_map(|c| match c {
            '?' | '*' | ':' | ';' | '<' | '>' | '|' | '\\' | '\0' => None,
            '"' | '`' | '\u{02DD}' => Some('\''),
            c => Some(c),
        })
        .collect();

    let cleaned: Vec<String> = substituted.split('/').map(clean_component).collect();
    let trailing_empty = cleaned.last().is_some_and(|c| c.is_empty());

    let mut result = cleaned
        .iter()
        .filter(|c| !c.is_empty())
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join("/");
    if trailing_empty && !result.is_empty() {
        result.push('/');
    }
    result
}

fn clean_component(component: &str) -> String {
    let collapsed = component.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c| c == '.' || c == ' ')
        .chars()
        .take(200)
        .collect()
}
