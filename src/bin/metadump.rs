use clap::{ArgAction, Parser, ValueEnum};
use mediameta::{
    directory::TagValue,
    formats::{bmp, eps, heif, jpeg, quicktime},
    metadata::{Metadata, UnknownTagTally},
    parser::ParseOptions,
    util::{hex_dump, read_head},
};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;

#[derive(Parser, Debug)]
#[command(version, about = "Dump the metadata directories of one media file")]
struct Args {
    /// Image or movie file path
    path: String,

    /// Container format; `auto` looks at the leading magic bytes
    #[arg(long, value_enum, default_value_t = Format::Auto)]
    format: Format,

    /// Emit JSON instead of text lines
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Hex dump the first N bytes of the file before the tags
    #[arg(long = "raw-hex", default_value_t = 0)]
    raw_hex: usize,

    /// Limit box nesting for QuickTime and HEIF
    #[arg(long, default_value_t = 64)]
    max_depth: usize,

    /// Count tags that have no name in their directory
    #[arg(long = "unknown-tags", action = ArgAction::SetTrue)]
    unknown_tags: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Auto,
    Bmp,
    Eps,
    Heif,
    Jpeg,
    Quicktime,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let mut f = BufReader::new(File::open(&args.path)?);
    let head = read_head(&mut f, args.raw_hex.max(16))?;

    let format = match args.format {
        Format::Auto => sniff(&head).ok_or_else(|| anyhow::anyhow!("unrecognised file format: {}", args.path))?,
        other => other,
    };
    log::info!("reading {} as {:?}", args.path, format);

    let options = ParseOptions { max_depth: args.max_depth };
    let metadata = match format {
        Format::Bmp => bmp::read_metadata(&mut f)?,
        Format::Eps => eps::read_metadata(&mut f)?,
        Format::Heif => heif::read_metadata_with(&mut f, options)?,
        Format::Jpeg => jpeg::read_metadata(&mut f)?,
        Format::Quicktime | Format::Auto => quicktime::read_metadata_with(&mut f, options)?,
    };

    if args.json {
        let report = JsonReport::new(&metadata, args.unknown_tags);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if args.raw_hex > 0 {
        let n = args.raw_hex.min(head.len());
        print!("{}", hex_dump(&head[..n], 0));
        println!();
    }

    print_text(&metadata);

    if args.unknown_tags {
        let mut tally = UnknownTagTally::new();
        tally.record(&metadata);
        println!();
        for (dir, tag, count) in tally.rows() {
            println!("{:<24} {:#06x} {:>6}", dir, tag, count);
        }
    }
    Ok(())
}

/// Picks a decoder from the leading bytes. Only the formats this tool
/// reads are recognised.
fn sniff(head: &[u8]) -> Option<Format> {
    if head.starts_with(&[0xFF, 0xD8]) {
        return Some(Format::Jpeg);
    }
    if head.starts_with(&[0xC5, 0xD0, 0xD3, 0xC6]) || head.starts_with(b"%!PS") {
        return Some(Format::Eps);
    }
    if let Some(magic) = head.get(..2) {
        if matches!(magic, b"BM" | b"BA" | b"CI" | b"CP" | b"IC" | b"PT") {
            return Some(Format::Bmp);
        }
    }
    let typ = head.get(4..8)?;
    if typ == b"ftyp" {
        let brand = head.get(8..12)?;
        return Some(match brand {
            b"heic" | b"heix" | b"hevc" | b"hevx" | b"mif1" | b"msf1" | b"avif" => Format::Heif,
            _ => Format::Quicktime,
        });
    }
    match typ {
        b"moov" | b"mdat" | b"wide" | b"free" | b"skip" | b"pnot" => Some(Format::Quicktime),
        _ => None,
    }
}

// ---------- Text output ----------

fn print_text(metadata: &Metadata) {
    for dir in metadata.directories() {
        for e in dir.errors() {
            println!("[ERROR: {}] {}", dir.name(), e);
        }
    }
    for tag in metadata.tags() {
        let desc = tag.description().unwrap_or_default();
        println!("[{} - {}] {} = {}", tag.directory_name(), tag.id_hex(), tag.name(), desc);
    }
}

// ---------- JSON representation ----------

#[derive(Serialize)]
struct JsonReport<'a> {
    directories: Vec<JsonDirectory<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unknown_tags: Option<Vec<JsonUnknownTag>>,
}

#[derive(Serialize)]
struct JsonDirectory<'a> {
    index: usize,
    name: &'static str,
    parent: Option<usize>,
    tags: Vec<JsonTag<'a>>,
    errors: &'a [String],
}

#[derive(Serialize)]
struct JsonTag<'a> {
    id: i32,
    name: String,
    value: JsonValue<'a>,
    description: Option<String>,
}

/// Byte arrays are summarised rather than serialised element by element.
#[derive(Serialize)]
#[serde(untagged)]
enum JsonValue<'a> {
    Bytes { len: usize, hex_preview: String },
    Value(&'a TagValue),
}

#[derive(Serialize)]
struct JsonUnknownTag {
    directory: &'static str,
    tag: i32,
    count: usize,
}

const HEX_PREVIEW: usize = 32;

impl<'a> JsonReport<'a> {
    fn new(metadata: &'a Metadata, unknown_tags: bool) -> Self {
        let directories = metadata
            .directories()
            .map(|dir| JsonDirectory {
                index: dir.id().index(),
                name: dir.name(),
                parent: dir.parent().map(|p| p.index()),
                tags: dir
                    .tags()
                    .map(|(id, value)| JsonTag {
                        id,
                        name: dir.tag_name(id),
                        value: match value {
                            TagValue::Bytes(b) => JsonValue::Bytes {
                                len: b.len(),
                                hex_preview: hex::encode(&b[..b.len().min(HEX_PREVIEW)]),
                            },
                            other => JsonValue::Value(other),
                        },
                        description: dir.description(id),
                    })
                    .collect(),
                errors: dir.errors(),
            })
            .collect();

        let unknown_tags = unknown_tags.then(|| {
            let mut tally = UnknownTagTally::new();
            tally.record(metadata);
            tally
                .rows()
                .into_iter()
                .map(|(directory, tag, count)| JsonUnknownTag { directory, tag, count })
                .collect()
        });

        JsonReport { directories, unknown_tags }
    }
}
