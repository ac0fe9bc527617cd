//! Random value text for mutation payloads

use rand::rngs::SmallRng;
use rand::Rng;

/// Random uppercase letters (A-Z only, so values never need escaping in a
/// GraphQL document).
pub(crate) fn letters(rng: &mut SmallRng, len: usize) -> String {
    (0..len).map(|_| rng.random_range(b'A'..=b'Z') as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_letters_length_and_alphabet() {
        let mut rng = SmallRng::seed_from_u64(1);
        let s = letters(&mut rng, 50);
        assert_eq!(s.len(), 50);
        assert!(s.chars().all(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn test_letters_deterministic_per_seed() {
        let mut a = SmallRng::seed_from_u64(9);
        let mut b = SmallRng::seed_from_u64(9);
        assert_eq!(letters(&mut a, 20), letters(&mut b, 20));
    }
}
