//! Input validation and formatting for Brazilian identifiers.
//!
//! Everything here is a pure function over strings. Invalid input never produces an error:
//! validators answer `false` and formatters return their best rendering of what was typed,
//! so they can be re-applied on every keystroke.

/// Maximum digits kept for CRM/RQE registration numbers.
const MAX_PROFILE_NUMBER_DIGITS: usize = 6;

/// Digits in a complete CPF.
const CPF_DIGITS: usize = 11;

/// Inline feedback for a CPF field while the user is typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpfCheck {
    /// Not enough digits yet to judge.
    Incomplete,
    Valid,
    Invalid,
}

/// Removes every character that is not an ASCII digit.
pub fn only_digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Validates a CPF number using its two check digits.
///
/// Formatting characters are ignored. Returns `false` when the input does not hold exactly
/// 11 digits, when all digits are the same (`111.111.111-11` passes the arithmetic but is
/// not issued), or when either check digit does not match.
///
/// # Examples
///
/// ```
/// use laudo_core::validation::validate_cpf;
///
/// assert!(validate_cpf("529.982.247-25"));
/// assert!(!validate_cpf("529.982.247-24"));
/// ```
pub fn validate_cpf(input: &str) -> bool {
    let digits: Vec<u32> = input.chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.len() != CPF_DIGITS || digits.iter().all(|&d| d == digits[0]) {
        return false;
    }

    cpf_check_digit(&digits[..9]) == digits[9] && cpf_check_digit(&digits[..10]) == digits[10]
}

/// Weighted mod-11 check digit over `prefix`, weights running from `prefix.len() + 1` down to 2.
fn cpf_check_digit(prefix: &[u32]) -> u32 {
    let top = prefix.len() as u32 + 1;
    let sum: u32 = prefix
        .iter()
        .enumerate()
        .map(|(i, &d)| d * (top - i as u32))
        .sum();

    match 11 - sum % 11 {
        10 | 11 => 0,
        d => d,
    }
}

/// Applies the `NNN.NNN.NNN-NN` mask to whatever digits have been typed so far.
///
/// Partial input gets a partial mask (`5299822` becomes `529.982.2`). Input with more than
/// 11 digits is returned unchanged.
pub fn format_cpf(raw: &str) -> String {
    let digits = only_digits(raw);
    let len = digits.len();

    match len {
        0..=3 => digits,
        4..=6 => format!("{}.{}", &digits[..3], &digits[3..]),
        7..=9 => format!("{}.{}.{}", &digits[..3], &digits[3..6], &digits[6..]),
        10..=11 => format!(
            "{}.{}.{}-{}",
            &digits[..3],
            &digits[3..6],
            &digits[6..9],
            &digits[9..]
        ),
        _ => raw.to_string(),
    }
}

/// Reports whether a verdict can be shown yet for a CPF being typed.
///
/// A verdict is only given once exactly 11 digits are present, so a half-typed CPF is never
/// flagged as invalid and overlong input gets no verdict.
pub fn check_cpf_input(raw: &str) -> CpfCheck {
    if only_digits(raw).len() != CPF_DIGITS {
        return CpfCheck::Incomplete;
    }

    if validate_cpf(raw) {
        CpfCheck::Valid
    } else {
        CpfCheck::Invalid
    }
}

/// Formats a Brazilian phone number.
///
/// - up to 10 digits (landline): `(DD) NNNN-NNNN`
/// - 11 digits (mobile): `(DD) NNNNN-NNNN`
///
/// The last group may be partial while typing. Fewer than 6 digits come back as bare digits,
/// and more than 11 digits leave the input untouched. Stripping happens first, so applying
/// the function to its own output is a no-op.
pub fn format_phone(raw: &str) -> String {
    let digits = only_digits(raw);

    match digits.len() {
        0..=5 => digits,
        6..=10 => format!("({}) {}-{}", &digits[..2], &digits[2..6], &digits[6..]),
        11 => format!("({}) {}-{}", &digits[..2], &digits[2..7], &digits[7..]),
        _ => raw.to_string(),
    }
}

/// Formats a CRM or RQE registration number: at most 6 digits, with a `.` separating the
/// last three once there are more than three.
pub fn format_profile_number(raw: &str) -> String {
    let mut digits = only_digits(raw);
    digits.truncate(MAX_PROFILE_NUMBER_DIGITS);

    if digits.len() > 3 {
        let split = digits.len() - 3;
        digits.insert(split, '.');
    }

    digits
}
