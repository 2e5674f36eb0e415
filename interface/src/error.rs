//! Custom error codes the `journal` program (and the system program it calls into) can fail
//! with, and their conversion to message strings.
//!
//! The program is built with Anchor, so account validation failures use Anchor's framework codes
//! rather than program-defined ones.

#[derive(Clone, Copy, Debug, Eq, PartialEq, strum_macros::FromRepr, strum_macros::EnumIter)]
#[repr(u32)]
pub enum JournalProgramError {
    /// The system program's `AccountAlreadyInUse`, raised when `init` targets a live account.
    AccountAlreadyInUse = 0,
    ConstraintMut = 2000,
    ConstraintHasOne = 2001,
    ConstraintSigner = 2002,
    ConstraintSeeds = 2006,
    AccountDiscriminatorNotFound = 3001,
    AccountDiscriminatorMismatch = 3002,
    AccountDidNotDeserialize = 3003,
    AccountNotInitialized = 3012,
}

impl JournalProgramError {
    pub fn from_code(code: u32) -> Option<Self> {
        Self::from_repr(code)
    }

    pub fn code(self) -> u32 {
        self as u32
    }
}

impl From<JournalProgramError> for &'static str {
    fn from(value: JournalProgramError) -> Self {
        match value {
            JournalProgramError::AccountAlreadyInUse => "Account is already in use",
            JournalProgramError::ConstraintMut => "A mut constraint was violated",
            JournalProgramError::ConstraintHasOne => "A has one constraint was violated",
            JournalProgramError::ConstraintSigner => "A signer constraint was violated",
            JournalProgramError::ConstraintSeeds => "A seeds constraint was violated",
            JournalProgramError::AccountDiscriminatorNotFound => {
                "No discriminator was found on the account"
            }
            JournalProgramError::AccountDiscriminatorMismatch => {
                "Account discriminator did not match what was expected"
            }
            JournalProgramError::AccountDidNotDeserialize => "Failed to deserialize the account",
            JournalProgramError::AccountNotInitialized => {
                "The program expected this account to be already initialized"
            }
        }
    }
}

impl core::fmt::Display for JournalProgramError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({})", <&'static str>::from(*self), self.code())
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn codes_are_stable() {
        for error in JournalProgramError::iter() {
            assert_eq!(JournalProgramError::from_code(error.code()), Some(error));
        }
        assert_eq!(JournalProgramError::ConstraintSeeds.code(), 2006);
        assert_eq!(JournalProgramError::AccountNotInitialized.code(), 3012);
        assert_eq!(JournalProgramError::from_code(6000), None);
    }
}
