/// Exit code to issue if apix itself fails, as opposed to the tests it ran.
pub const CODE_ERROR: i32 = 101;

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct ExitCode(i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
    pub const APIX_ERROR: ExitCode = ExitCode(CODE_ERROR);

    pub const fn get(&self) -> i32 {
        self.0
    }

    pub const fn new(code: i32) -> Self {
        Self(code)
    }

    /// Maps an overall pass/fail verdict to the process exit code.
    pub const fn from_verdict(passed: bool) -> Self {
        if passed {
            Self::SUCCESS
        } else {
            Self::FAILURE
        }
    }
}

#[cfg(test)]
mod test {
    use super::ExitCode;

    #[test]
    fn verdict_maps_to_exit_code() {
        assert_eq!(ExitCode::from_verdict(true).get(), 0);
        assert_eq!(ExitCode::from_verdict(false).get(), 1);
        assert_eq!(ExitCode::APIX_ERROR.get(), 101);
    }
}
