// src/common/phone.rs

//! Identidade de telefone usada em todo o sistema.
//!
//! Toda comparação ou gravação de telefone passa por aqui: o gateway às vezes
//! envia o número com o código do país (`55`) e às vezes sem, e os números
//! digitados no painel raramente seguem um formato.

const COUNTRY_CODE: &str = "55";

/// Extrai os dígitos, remove zeros à esquerda e o prefixo `55` de números
/// nacionais completos (12 ou 13 dígitos). Nunca falha; entrada vazia vira "".
pub fn normalize(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    let digits = digits.trim_start_matches('0');

    let national = match digits.strip_prefix(COUNTRY_CODE) {
        Some(rest) if matches!(digits.len(), 12 | 13) => rest,
        _ => digits,
    };

    national.trim_start_matches('0').to_string()
}

/// Formato aceito pelo gateway: número nacional (10 ou 11 dígitos) com `55` na frente.
pub fn to_whatsapp_format(phone: &str) -> String {
    let normalized = normalize(phone);
    if matches!(normalized.len(), 10 | 11) {
        format!("{COUNTRY_CODE}{normalized}")
    } else {
        normalized
    }
}

/// Dois telefones são o mesmo contato se coincidem após normalizar, com ou sem
/// o `55` na frente de qualquer um dos lados.
pub fn phones_match(a: &str, b: &str) -> bool {
    let a = normalize(a);
    let b = normalize(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }

    let a_stripped = a.strip_prefix(COUNTRY_CODE).unwrap_or(&a);
    let b_stripped = b.strip_prefix(COUNTRY_CODE).unwrap_or(&b);

    a == b || a_stripped == b || a == b_stripped || a_stripped == b_stripped
}

/// Formas em que um telefone pode estar gravado, para buscas por igualdade no banco.
pub fn lookup_variants(phone: &str) -> Vec<String> {
    let normalized = normalize(phone);
    if normalized.is_empty() {
        return Vec::new();
    }

    let mut variants = vec![normalized.clone(), format!("{COUNTRY_CODE}{normalized}")];
    if let Some(stripped) = normalized.strip_prefix(COUNTRY_CODE) {
        if !stripped.is_empty() {
            variants.push(stripped.to_string());
        }
    }
    variants
}

/// Quantidade de dígitos plausível para um número de WhatsApp (10 a 15).
pub fn is_valid_length(digits: &str) -> bool {
    (10..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "",
        "abc",
        "0",
        "(11) 99999-8888",
        "+55 (11) 99999-8888",
        "5511999998888",
        "551199998888",
        "011999998888",
        "0551199998888",
        "55055119999888",
        "5555999887766",
        "55991234567",
        "5599",
        "5512345",
        "555512345",
        "+1 415 555 0100",
        "14155550100",
        "00000",
        "5555555555555555",
    ];

    #[test]
    fn strips_formatting_and_country_code() {
        assert_eq!(normalize("+55 (11) 99999-8888"), "11999998888");
        assert_eq!(normalize("(11) 9999-8888"), "1199998888");
        assert_eq!(normalize("551199998888"), "1199998888");
        assert_eq!(normalize("011999998888"), "11999998888");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("sem número"), "");
    }

    #[test]
    fn keeps_area_code_55_on_national_numbers() {
        // DDD 55 (RS) com 11 dígitos não é código de país
        assert_eq!(normalize("55991234567"), "55991234567");
        assert_eq!(normalize("5555991234567"), "55991234567");
    }

    #[test]
    fn normalize_is_idempotent() {
        for sample in SAMPLES {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "entrada: {sample:?}");
        }
    }

    #[test]
    fn matches_with_or_without_country_code() {
        for sample in SAMPLES {
            let normalized = normalize(sample);
            if normalized.is_empty() {
                continue;
            }
            let prefixed = format!("55{normalized}");
            assert!(phones_match(sample, &prefixed), "entrada: {sample:?}");
        }
        assert!(phones_match("551199999999", "(11) 9999-9999"));
        assert!(!phones_match("11999998888", "11999997777"));
        assert!(!phones_match("", ""));
    }

    #[test]
    fn whatsapp_format_prefixes_national_numbers() {
        assert_eq!(to_whatsapp_format("(11) 99999-8888"), "5511999998888");
        assert_eq!(to_whatsapp_format("5511999998888"), "5511999998888");
        assert_eq!(to_whatsapp_format("55991234567"), "5555991234567");
        assert_eq!(to_whatsapp_format("14155550100"), "5514155550100");
        assert_eq!(to_whatsapp_format("123"), "123");
    }

    #[test]
    fn variants_cover_stored_forms() {
        let variants = lookup_variants("+55 11 99999-8888");
        assert!(variants.contains(&"11999998888".to_string()));
        assert!(variants.contains(&"5511999998888".to_string()));
        assert!(lookup_variants("").is_empty());
    }

    #[test]
    fn validates_digit_count() {
        assert!(is_valid_length("1199998888"));
        assert!(is_valid_length("5511999998888"));
        assert!(!is_valid_length("119999888"));
        assert!(!is_valid_length("1234567890123456"));
        assert!(!is_valid_length("11a9998888"));
    }
}
