use crate::error::EncodingError;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// The character set spit IDs are built from.
pub const DEFAULT_CHARS: &str = "Ca1MoKtUR5A2BfeGm8LWwlFgHOx3hNk9ciTpuqZ7nrQjXyzJbvI64V0EYPsDSd";

/// An ordered set of K >= 2 distinct characters defining a base-K numeral system.
///
/// [`Alphabet::encode`] / [`Alphabet::decode`] implement *bijective* base-K
/// numeration, shifted by one so that `0` maps to the first character and the
/// empty string is not a valid encoding:
///
/// ```
/// use spito_encoding::Alphabet;
///
/// let abc = Alphabet::new("abc").unwrap();
/// assert_eq!(abc.encode(0), "a");
/// assert_eq!(abc.encode(2), "c");
/// assert_eq!(abc.encode(3), "aa");
/// assert_eq!(abc.decode("aa"), Ok(3));
/// ```
///
/// [`Alphabet::encode_padded`] / [`Alphabet::decode_padded`] implement a
/// positional numeral of a fixed width, padded with the first character. They
/// are used for the segments of composite IDs, where every segment must have a
/// known length.
#[derive(Clone, PartialEq, Eq)]
pub struct Alphabet {
    chars: Vec<char>,
    index: HashMap<char, u64>,
}

impl Alphabet {
    /// Builds an alphabet from the characters of `chars`, in order.
    pub fn new(chars: &str) -> Result<Self, EncodingError> {
        let chars: Vec<char> = chars.chars().collect();
        if chars.len() < 2 {
            return Err(EncodingError::InvalidAlphabet(format!(
                "need at least 2 characters, got {}",
                chars.len()
            )));
        }

        let mut index = HashMap::with_capacity(chars.len());
        for (digit, &c) in chars.iter().enumerate() {
            if index.insert(c, digit as u64).is_some() {
                return Err(EncodingError::InvalidAlphabet(format!(
                    "character {c:?} appears more than once"
                )));
            }
        }

        Ok(Self { chars, index })
    }

    /// Number of characters in the alphabet.
    pub fn base(&self) -> usize {
        self.chars.len()
    }

    /// Returns `true` if `c` belongs to the alphabet.
    pub fn contains(&self, c: char) -> bool {
        self.index.contains_key(&c)
    }

    /// Returns a copy of this alphabet with its characters randomly permuted.
    pub fn shuffled<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let mut chars = self.chars.clone();
        chars.shuffle(rng);
        let index = chars
            .iter()
            .enumerate()
            .map(|(digit, &c)| (c, digit as u64))
            .collect();
        Self { chars, index }
    }

    /// Encodes `n`. Never fails; the output grows logarithmically with `n`.
    pub fn encode(&self, n: u64) -> String {
        let base = self.base() as u128;
        let mut value = n as u128 + 1;
        let mut digits = Vec::new();

        while value > 0 {
            let rem = (value - 1) % base;
            digits.push(self.chars[rem as usize]);
            value = (value - 1) / base;
        }

        digits.iter().rev().collect()
    }

    /// Decodes a string produced by [`Alphabet::encode`].
    pub fn decode(&self, s: &str) -> Result<u64, EncodingError> {
        if s.is_empty() {
            return Err(EncodingError::EmptyInput);
        }
        let digits = self.digits(s)?;

        let base = self.base() as u128;
        let limit = u64::MAX as u128 + 1;
        let mut value: u128 = 0;
        for digit in digits {
            value = value
                .checked_mul(base)
                .and_then(|v| v.checked_add(digit as u128 + 1))
                .filter(|v| *v <= limit)
                .ok_or(EncodingError::Overflow)?;
        }

        Ok((value - 1) as u64)
    }

    /// Returns `true` if `s` decodes without error.
    ///
    /// This says nothing about whether the ID was ever issued.
    pub fn is_valid(&self, s: &str) -> bool {
        self.decode(s).is_ok()
    }

    /// Encodes `n` as exactly `width` positional digits.
    pub fn encode_padded(&self, n: u64, width: usize) -> Result<String, EncodingError> {
        let base = self.base() as u64;
        let mut digits = vec![self.chars[0]; width];
        let mut value = n;

        for slot in digits.iter_mut().rev() {
            if value == 0 {
                break;
            }
            *slot = self.chars[(value % base) as usize];
            value /= base;
        }

        if value != 0 {
            return Err(EncodingError::SegmentOverflow { value: n, width });
        }
        Ok(digits.into_iter().collect())
    }

    /// Decodes a segment produced by [`Alphabet::encode_padded`].
    pub fn decode_padded(&self, s: &str, width: usize) -> Result<u64, EncodingError> {
        let digits = self.digits(s)?;
        if digits.len() != width {
            return Err(EncodingError::InvalidLength {
                expected: width,
                actual: digits.len(),
            });
        }

        let base = self.base() as u64;
        digits.into_iter().try_fold(0_u64, |acc, digit| {
            acc.checked_mul(base)
                .and_then(|v| v.checked_add(digit))
                .ok_or(EncodingError::Overflow)
        })
    }

    fn digits(&self, s: &str) -> Result<Vec<u64>, EncodingError> {
        s.chars()
            .enumerate()
            .map(|(position, character)| {
                self.index
                    .get(&character)
                    .copied()
                    .ok_or(EncodingError::InvalidCharacter {
                        character,
                        position,
                    })
            })
            .collect()
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        let chars: Vec<char> = DEFAULT_CHARS.chars().collect();
        let index = chars
            .iter()
            .enumerate()
            .map(|(digit, &c)| (c, digit as u64))
            .collect();
        Self { chars, index }
    }
}

impl FromStr for Alphabet {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.chars.iter().try_for_each(|c| write!(f, "{c}"))
    }
}

impl fmt::Debug for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Alphabet").field(&self.to_string()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn rejects_short_or_repeated_alphabets() {
        assert!(matches!(
            Alphabet::new("a"),
            Err(EncodingError::InvalidAlphabet(_))
        ));
        assert!(matches!(
            Alphabet::new("abca"),
            Err(EncodingError::InvalidAlphabet(_))
        ));
        assert!(Alphabet::new("ab").is_ok());
    }

    #[test]
    fn small_values_follow_bijective_numeration() {
        let abc = Alphabet::new("abc").unwrap();
        let expected = ["a", "b", "c", "aa", "ab", "ac", "ba", "bb", "bc", "ca", "cb", "cc", "aaa"];
        for (n, want) in expected.iter().enumerate() {
            assert_eq!(abc.encode(n as u64), *want, "encode({n})");
            assert_eq!(abc.decode(want), Ok(n as u64), "decode({want})");
        }
    }

    #[test]
    fn round_trips_boundary_values() {
        let alphabets = [
            Alphabet::default(),
            Alphabet::new("01").unwrap(),
            Alphabet::new("αβγδ").unwrap(),
        ];
        let values = [0, 1, 61, 62, 63, 3843, 3844, 1 << 32, u64::MAX - 1, u64::MAX];

        for alphabet in &alphabets {
            for n in values {
                let encoded = alphabet.encode(n);
                assert_eq!(alphabet.decode(&encoded), Ok(n), "{alphabet:?} n={n}");
            }
        }
    }

    #[test]
    fn output_grows_logarithmically() {
        let alphabet = Alphabet::default();
        assert_eq!(alphabet.encode(61).chars().count(), 1);
        assert_eq!(alphabet.encode(62).chars().count(), 2);
        assert!(alphabet.encode(u64::MAX).chars().count() <= 11);
    }

    #[test]
    fn decode_reports_the_first_invalid_character() {
        let alphabet = Alphabet::default();
        assert_eq!(
            alphabet.decode("Ca-1"),
            Err(EncodingError::InvalidCharacter {
                character: '-',
                position: 2
            })
        );
        assert!(!alphabet.is_valid("hello world"));
    }

    #[test]
    fn invalid_character_wins_over_overflow() {
        let alphabet = Alphabet::default();
        let too_long = format!("{}!", "d".repeat(40));
        assert!(matches!(
            alphabet.decode(&too_long),
            Err(EncodingError::InvalidCharacter { character: '!', .. })
        ));
    }

    #[test]
    fn decode_rejects_empty_and_overflowing_input() {
        let alphabet = Alphabet::default();
        assert_eq!(alphabet.decode(""), Err(EncodingError::EmptyInput));

        let one_past_max = alphabet.encode(u64::MAX);
        let longer = format!("{}C", one_past_max);
        assert_eq!(alphabet.decode(&longer), Err(EncodingError::Overflow));
    }

    #[test]
    fn padded_segments_have_fixed_width() {
        let alphabet = Alphabet::new("0123456789").unwrap();
        assert_eq!(alphabet.encode_padded(0, 4).unwrap(), "0000");
        assert_eq!(alphabet.encode_padded(42, 4).unwrap(), "0042");
        assert_eq!(alphabet.encode_padded(9999, 4).unwrap(), "9999");
        assert_eq!(
            alphabet.encode_padded(10_000, 4),
            Err(EncodingError::SegmentOverflow {
                value: 10_000,
                width: 4
            })
        );
        assert_eq!(alphabet.decode_padded("0042", 4), Ok(42));
        assert_eq!(
            alphabet.decode_padded("042", 4),
            Err(EncodingError::InvalidLength {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn shuffled_alphabet_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        let original = Alphabet::default();
        let shuffled = original.shuffled(&mut rng);

        assert_eq!(shuffled.base(), original.base());
        assert!(DEFAULT_CHARS.chars().all(|c| shuffled.contains(c)));
        assert_ne!(shuffled.to_string(), original.to_string());

        let n = 987_654_321;
        assert_eq!(shuffled.decode(&shuffled.encode(n)), Ok(n));
    }

    #[test]
    fn display_and_parse_agree() {
        let alphabet: Alphabet = "xyz".parse().unwrap();
        assert_eq!(alphabet.to_string(), "xyz");
        assert_eq!(Alphabet::default().to_string(), DEFAULT_CHARS);
    }
}
