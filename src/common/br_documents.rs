// src/common/br_documents.rs

// Utilitários para documentos brasileiros (CNPJ, CPF, CEP, UF).
// Todos os validadores esperam a string já normalizada (apenas dígitos).

const CNPJ_WEIGHTS_FIRST: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const CNPJ_WEIGHTS_SECOND: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

pub const BRAZILIAN_STATES: [&str; 27] = [
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA", "PB",
    "PR", "PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO",
];

/// Remove tudo que não for dígito ("12.345.678/0001-95" -> "12345678000195").
pub fn only_digits(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn to_digits(value: &str) -> Option<Vec<u32>> {
    value.chars().map(|c| c.to_digit(10)).collect()
}

fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    let remainder = sum % 11;
    if remainder < 2 { 0 } else { 11 - remainder }
}

fn all_equal(digits: &[u32]) -> bool {
    digits.windows(2).all(|w| w[0] == w[1])
}

/// Calcula os dois dígitos verificadores a partir dos 12 primeiros dígitos do CNPJ.
pub fn cnpj_check_digits(base: &str) -> Option<(u32, u32)> {
    let digits = to_digits(base)?;
    if digits.len() != 12 {
        return None;
    }
    let first = check_digit(&digits, &CNPJ_WEIGHTS_FIRST);
    let mut with_first = digits.clone();
    with_first.push(first);
    let second = check_digit(&with_first, &CNPJ_WEIGHTS_SECOND);
    Some((first, second))
}

pub fn validate_cnpj(cnpj: &str) -> bool {
    let Some(digits) = to_digits(cnpj) else {
        return false;
    };
    if digits.len() != 14 || all_equal(&digits) {
        return false;
    }
    match cnpj_check_digits(&cnpj[..12]) {
        Some((first, second)) => digits[12] == first && digits[13] == second,
        None => false,
    }
}

pub fn validate_cpf(cpf: &str) -> bool {
    let Some(digits) = to_digits(cpf) else {
        return false;
    };
    if digits.len() != 11 || all_equal(&digits) {
        return false;
    }
    let weights_first: Vec<u32> = (2..=10).rev().collect();
    let weights_second: Vec<u32> = (2..=11).rev().collect();

    let first = check_digit(&digits[..9], &weights_first);
    let second = check_digit(&digits[..10], &weights_second);
    digits[9] == first && digits[10] == second
}

pub fn validate_cep(cep: &str) -> bool {
    cep.len() == 8 && cep.chars().all(|c| c.is_ascii_digit())
}

pub fn validate_state(uf: &str) -> bool {
    BRAZILIAN_STATES.contains(&uf)
}

/// Telefone brasileiro: DDD + número (10 ou 11 dígitos).
pub fn validate_phone(phone: &str) -> bool {
    (10..=11).contains(&phone.len()) && phone.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_formatting() {
        assert_eq!(only_digits("11.222.333/0001-81"), "11222333000181");
        assert_eq!(only_digits("(11) 98765-4321"), "11987654321");
    }

    #[test]
    fn accepts_known_valid_cnpjs() {
        assert!(validate_cnpj("11222333000181"));
        assert!(validate_cnpj("11444777000161"));
        assert!(!validate_cnpj("11222333000182"));
        assert!(!validate_cnpj("11111111111111"));
        assert!(!validate_cnpj("1122233300018"));
    }

    #[test]
    fn accepted_cnpjs_have_recomputed_check_digits() {
        // Gera bases variadas, completa com os verificadores e confere o round-trip
        for seed in 0u64..500 {
            let base = format!("{:012}", seed.wrapping_mul(7_919_393) % 1_000_000_000_000);
            let (first, second) = cnpj_check_digits(&base).unwrap();
            let cnpj = format!("{base}{first}{second}");
            if !validate_cnpj(&cnpj) {
                // só bases com todos os dígitos iguais são rejeitadas
                assert!(cnpj.chars().all(|c| c == cnpj.chars().next().unwrap()));
                continue;
            }
            let digits: Vec<u32> = cnpj.chars().map(|c| c.to_digit(10).unwrap()).collect();
            let (f, s) = cnpj_check_digits(&cnpj[..12]).unwrap();
            assert_eq!((digits[12], digits[13]), (f, s));
        }
    }

    #[test]
    fn validates_cpf_checksum() {
        assert!(validate_cpf("52998224725"));
        assert!(!validate_cpf("52998224724"));
        assert!(!validate_cpf("00000000000"));
    }

    #[test]
    fn validates_cep_state_and_phone() {
        assert!(validate_cep("01310100"));
        assert!(!validate_cep("0131010"));
        assert!(validate_state("SP"));
        assert!(!validate_state("XX"));
        assert!(validate_phone("1133334444"));
        assert!(validate_phone("11987654321"));
        assert!(!validate_phone("987654321"));
    }
}
