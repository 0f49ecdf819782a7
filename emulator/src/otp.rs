//! The OTP generator collaborator: produces the confirmation / MFA codes
//! delivered through [`crate::messages::Messages`]. A trait so tests can
//! substitute a fixed code (scenario 2 in the testable-properties section
//! uses the literal `"1234"`).

use rand::Rng;

#[cfg_attr(test, mockall::automock)]
pub trait OtpGenerator: Send + Sync {
    /// Generates a new one-time code. The upstream service always uses a
    /// 6-digit numeric code, zero-padded.
    fn generate(&self) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomOtpGenerator;

impl OtpGenerator for RandomOtpGenerator {
    fn generate(&self) -> String {
        let value: u32 = rand::thread_rng().gen_range(0..1_000_000);
        format!("{value:06}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_code_is_six_digits() {
        let generator = RandomOtpGenerator;
        for _ in 0..50 {
            let code = generator.generate();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
