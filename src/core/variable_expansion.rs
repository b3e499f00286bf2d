use nix::unistd::Pid;

/// Expands to the shell's own process id.
pub const PID_VARIABLE: &str = "$$";

/// Replaces every non-overlapping `$$` in `word`, scanning left to right,
/// with the decimal form of `pid`.
pub fn expand_pid(word: &str, pid: Pid) -> String {
    if !word.contains(PID_VARIABLE) {
        return word.to_string();
    }

    word.replace(PID_VARIABLE, &pid.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::Rng;

    #[test]
    fn test_pid_expansion() {
        let pid = Pid::from_raw(1234);
        assert_eq!(expand_pid("foo$$", pid), "foo1234");
        assert_eq!(expand_pid("$$foo", pid), "1234foo");
        assert_eq!(expand_pid("$$$$$$", pid), "123412341234");
        assert_eq!(expand_pid("a$$b$$c", pid), "a1234b1234c");
    }

    #[test]
    fn test_odd_dollar_signs() {
        let pid = Pid::from_raw(42);
        assert_eq!(expand_pid("$", pid), "$");
        assert_eq!(expand_pid("$$$", pid), "42$");
        assert_eq!(expand_pid("$a$", pid), "$a$");
    }

    #[test]
    fn test_no_expansion() {
        let pid = Pid::from_raw(42);
        assert_eq!(expand_pid("", pid), "");
        assert_eq!(expand_pid("plain", pid), "plain");
        assert_eq!(expand_pid("$HOME", pid), "$HOME");
    }

    #[test]
    fn test_expanded_length() {
        let mut rng = rand::thread_rng();
        let alphabet = ['$', 'a', 'b', '/', '.'];

        for _ in 0..500 {
            let pid = Pid::from_raw(rng.gen_range(1..4_000_000));
            let len = rng.gen_range(0..24);
            let word: String = (0..len)
                .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
                .collect();
            let occurrences = word.matches(PID_VARIABLE).count();
            let pid_len = pid.to_string().len();

            let expanded = expand_pid(&word, pid);
            assert_eq!(
                expanded.len() + 2 * occurrences,
                word.len() + occurrences * pid_len,
                "word: {:?}",
                word
            );
        }
    }
}
