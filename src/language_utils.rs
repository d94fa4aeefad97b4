use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for the locale codes found in string tables
///
/// String tables name languages with bare ISO codes ("de", "deu") or with
/// locale tags ("pt-BR", "zh_Hans"). These helpers reduce both to the primary
/// ISO language so providers and legacy translators can be compared.

/// ISO 639-2/B codes that differ from their ISO 639-2/T form
const BIBLIOGRAPHIC_CODES: [(&str, &str); 18] = [
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Split a locale tag into its primary language subtag
pub fn primary_subtag(code: &str) -> String {
    code.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Resolve a code or locale tag to an ISO language
pub fn resolve_language(code: &str) -> Result<Language> {
    let primary = primary_subtag(code);
    let resolved = match primary.len() {
        2 => Language::from_639_1(&primary),
        3 => {
            let part2t = BIBLIOGRAPHIC_CODES
                .iter()
                .find(|(bibliographic, _)| *bibliographic == primary)
                .map(|(_, terminological)| *terminological)
                .unwrap_or(primary.as_str());
            Language::from_639_3(part2t)
        }
        _ => None,
    };
    resolved.ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Normalize a code to ISO 639-1 where one exists, else ISO 639-3
pub fn normalize_language_code(code: &str) -> Result<String> {
    let language = resolve_language(code)?;
    Ok(language
        .to_639_1()
        .map(str::to_string)
        .unwrap_or_else(|| language.to_639_3().to_string()))
}

/// Check if two codes or locale tags name the same language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (resolve_language(code1), resolve_language(code2)) {
        (Ok(first), Ok(second)) => first == second,
        _ => false,
    }
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    Ok(resolve_language(code)?.to_name().to_string())
}

/// Name to show a provider: the English name if the code resolves, else the code itself
pub fn display_name_or_code(code: &str) -> String {
    get_language_name(code).unwrap_or_else(|_| code.trim().to_string())
}
