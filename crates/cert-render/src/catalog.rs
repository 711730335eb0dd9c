//! Fixed font catalog.
//!
//! Each key maps to a label for admin UIs and an ordered list of font file
//! names. The resolver tries the files in order, so metric-compatible system
//! fonts come first and the bundled DejaVu fonts act as the portable choice.
//! Aliases keep placement settings written for the older PDF renderer
//! (`helv`, `tiro`, ...) working.

/// Key used when a requested key is unknown.
pub const DEFAULT_FONT_KEY: &str = "arial";

/// A catalog entry.
#[derive(Debug, PartialEq, Eq)]
pub struct FontEntry {
    pub key: &'static str,
    pub label: &'static str,
    pub files: &'static [&'static str],
    pub aliases: &'static [&'static str],
}

/// All selectable fonts. The default entry is first.
pub static FONT_CATALOG: &[FontEntry] = &[
    FontEntry {
        key: "arial",
        label: "Arial / Sans-serif",
        files: &[
            "arial.ttf",
            "Arial.ttf",
            "DejaVuSans.ttf",
            "LiberationSans-Regular.ttf",
            "NotoSans-Regular.ttf",
            "FreeSans.ttf",
        ],
        aliases: &["helv", "helvetica", "sans"],
    },
    FontEntry {
        key: "arial_bold",
        label: "Arial Bold",
        files: &[
            "arialbd.ttf",
            "Arial Bold.ttf",
            "DejaVuSans-Bold.ttf",
            "LiberationSans-Bold.ttf",
            "NotoSans-Bold.ttf",
            "FreeSansBold.ttf",
        ],
        aliases: &["hebo"],
    },
    FontEntry {
        key: "times",
        label: "Times New Roman / Serif",
        files: &[
            "times.ttf",
            "Times New Roman.ttf",
            "DejaVuSerif.ttf",
            "LiberationSerif-Regular.ttf",
            "Tinos-Regular.ttf",
            "FreeSerif.ttf",
        ],
        aliases: &["tiro", "tiit", "serif"],
    },
    FontEntry {
        key: "times_bold",
        label: "Times New Roman Bold",
        files: &[
            "timesbd.ttf",
            "Times New Roman Bold.ttf",
            "DejaVuSerif-Bold.ttf",
            "LiberationSerif-Bold.ttf",
            "Tinos-Bold.ttf",
            "FreeSerifBold.ttf",
        ],
        aliases: &["tibo"],
    },
    FontEntry {
        key: "courier",
        label: "Courier / Monospace",
        files: &[
            "cour.ttf",
            "Courier New.ttf",
            "DejaVuSansMono.ttf",
            "LiberationMono-Regular.ttf",
            "FreeMono.ttf",
        ],
        aliases: &["cour", "cobo", "mono"],
    },
];

/// Find an entry by key or alias, ignoring ASCII case and surrounding whitespace.
pub fn lookup(key: &str) -> Option<&'static FontEntry> {
    let key = key.trim();
    FONT_CATALOG.iter().find(|entry| {
        entry.key.eq_ignore_ascii_case(key)
            || entry.aliases.iter().any(|a| a.eq_ignore_ascii_case(key))
    })
}

/// The entry used for unknown keys.
pub fn default_entry() -> &'static FontEntry {
    &FONT_CATALOG[0]
}

/// Find an entry, falling back to the default entry.
pub fn entry_or_default(key: &str) -> &'static FontEntry {
    lookup(key).unwrap_or_else(default_entry)
}

/// Canonical key for a requested key (`"TIRO"` -> `"times"`, `"nope"` -> `"arial"`).
pub fn canonical_key(key: &str) -> &'static str {
    entry_or_default(key).key
}
