use serde::Serialize;

/// Extension of files copied verbatim
const MP3_EXTENSION: &str = ".mp3";

/// Extensions of files that are converted to MP3
const TRANSCODABLE_EXTENSIONS: [&str; 3] = [".m4a", ".aif", ".wav"];

/// How a source file is treated, decided by its extension alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Already MP3, copied as-is
    Mp3,
    /// Converted to MP3 by the encoder
    Transcodable,
    /// Not music, or a hidden file
    Ignored,
}

/// The action needed to bring a source file into the destination tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Copy,
    Transcode,
}

impl Category {
    /// Action to take for files of this category, `None` for ignored files
    pub fn action(self) -> Option<Action> {
        match self {
            Category::Mp3 => Some(Action::Copy),
            Category::Transcodable => Some(Action::Transcode),
            Category::Ignored => None,
        }
    }
}

/// Determine the category of a relative path
///
/// Matching is case-sensitive on the literal suffix. Files whose name starts
/// with a dot are always ignored, whatever their extension.
pub fn categorize(relative_path: &str) -> Category {
    if is_hidden(relative_path) {
        return Category::Ignored;
    }

    if relative_path.ends_with(MP3_EXTENSION) {
        Category::Mp3
    } else if transcodable_extension(relative_path).is_some() {
        Category::Transcodable
    } else {
        Category::Ignored
    }
}

/// Derive the canonical destination path for a source path
///
/// Returns the destination relative path (`None` for ignored files) together
/// with the category. MP3 paths are returned unchanged; transcodable paths get
/// their extension replaced by `.mp3` and are folded to ASCII.
pub fn canonicalize(relative_path: &str) -> (Option<String>, Category) {
    let category = categorize(relative_path);

    let destination = match category {
        Category::Mp3 => Some(relative_path.to_string()),
        Category::Transcodable => {
            let ext = transcodable_extension(relative_path).unwrap_or_default();
            let stem = &relative_path[..relative_path.len() - ext.len()];
            Some(fold_to_ascii(&format!("{stem}{MP3_EXTENSION}")))
        }
        Category::Ignored => None,
    };

    (destination, category)
}

/// Returns true if a string contains characters outside the ASCII range
pub fn contains_non_ascii(s: &str) -> bool {
    s.chars().any(|c| !c.is_ascii())
}

/// Fold accented Latin letters to ASCII and drop everything else above 127
///
/// ASCII characters, including punctuation and whitespace, pass through.
pub fn fold_to_ascii(s: &str) -> String {
    if !contains_non_ascii(s) {
        return s.to_string();
    }

    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii() {
            result.push(c);
        } else if let Some(folded) = fold_char(c) {
            result.push_str(folded);
        }
    }
    result
}

fn is_hidden(relative_path: &str) -> bool {
    relative_path
        .rsplit('/')
        .next()
        .is_some_and(|name| name.starts_with('.'))
}

fn transcodable_extension(relative_path: &str) -> Option<&'static str> {
    TRANSCODABLE_EXTENSIONS
        .into_iter()
        .find(|ext| relative_path.ends_with(ext))
}

/// ASCII replacement for a non-ASCII character, if one exists
fn fold_char(c: char) -> Option<&'static str> {
    let folded = match c {
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' | 'Ă' | 'Ą' => "A",
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'Æ' => "AE",
        'æ' => "ae",
        'Ç' | 'Ć' | 'Ĉ' | 'Ċ' | 'Č' => "C",
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => "c",
        'Ð' | 'Ď' | 'Đ' => "D",
        'ð' | 'ď' | 'đ' => "d",
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ĕ' | 'Ė' | 'Ę' | 'Ě' => "E",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => "e",
        'Ĝ' | 'Ğ' | 'Ġ' | 'Ģ' => "G",
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => "g",
        'Ĥ' | 'Ħ' => "H",
        'ĥ' | 'ħ' => "h",
        'Ì' | 'Í' | 'Î' | 'Ï' | 'Ĩ' | 'Ī' | 'Ĭ' | 'Į' | 'İ' => "I",
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => "i",
        'Ĵ' => "J",
        'ĵ' => "j",
        'Ķ' => "K",
        'ķ' => "k",
        'Ĺ' | 'Ļ' | 'Ľ' | 'Ŀ' | 'Ł' => "L",
        'ĺ' | 'ļ' | 'ľ' | 'ŀ' | 'ł' => "l",
        'Ñ' | 'Ń' | 'Ņ' | 'Ň' => "N",
        'ñ' | 'ń' | 'ņ' | 'ň' => "n",
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' | 'Ō' | 'Ŏ' | 'Ő' => "O",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => "o",
        'Œ' => "OE",
        'œ' => "oe",
        'Ŕ' | 'Ŗ' | 'Ř' => "R",
        'ŕ' | 'ŗ' | 'ř' => "r",
        'Ś' | 'Ŝ' | 'Ş' | 'Š' | 'Ș' => "S",
        'ś' | 'ŝ' | 'ş' | 'š' | 'ș' => "s",
        'ß' => "ss",
        'Ţ' | 'Ť' | 'Ŧ' | 'Ț' => "T",
        'ţ' | 'ť' | 'ŧ' | 'ț' => "t",
        'Þ' => "Th",
        'þ' => "th",
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ũ' | 'Ū' | 'Ŭ' | 'Ů' | 'Ű' | 'Ų' => "U",
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => "u",
        'Ŵ' => "W",
        'ŵ' => "w",
        'Ý' | 'Ŷ' | 'Ÿ' => "Y",
        'ý' | 'ÿ' | 'ŷ' => "y",
        'Ź' | 'Ż' | 'Ž' => "Z",
        'ź' | 'ż' | 'ž' => "z",
        _ => return None,
    };
    Some(folded)
}
