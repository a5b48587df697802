//! Deck Generation
//!
//! Builds the shuffled paired card deck for a new session. Pair values
//! come from the active image pool when one exists, otherwise from a
//! fixed icon palette; either pool is cycled by index modulo its length.

use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::game::level::CardImage;
use crate::game::session::Card;

/// Fallback icon palette used when no card images are configured.
pub const CARD_ICONS: [&str; 32] = [
    "🎮", "🎯", "🎲", "🎪", "🎨", "🎭", "🎳", "🎸",
    "⚽", "🏀", "🎾", "🏈", "⚾", "🎱", "🏐", "🏉",
    "🌟", "⭐", "✨", "💫", "🌙", "☀️", "🌈", "🔥",
    "🍎", "🍊", "🍋", "🍌", "🍉", "🍇", "🍓", "🍒",
];

/// Generate a shuffled deck of `2 * pair_count` cards.
///
/// Each pair value yields exactly two face-down, unmatched cards. The
/// full sequence is then permuted uniformly at random; the resulting
/// index is the public card position referenced by flip requests.
pub fn generate_deck(pair_count: u32, images: &[CardImage]) -> Vec<Card> {
    let mut deck = Vec::with_capacity(pair_count as usize * 2);

    for i in 0..pair_count as usize {
        let value = if images.is_empty() {
            CARD_ICONS[i % CARD_ICONS.len()].to_string()
        } else {
            images[i % images.len()].url.clone()
        };
        deck.push(Card::new(value.clone()));
        deck.push(Card::new(value));
    }

    deck.shuffle(&mut thread_rng());
    deck
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn test_images(count: usize) -> Vec<CardImage> {
        (0..count)
            .map(|i| CardImage {
                id: i as u64 + 1,
                url: format!("/static/card_images/{i}.png"),
                name: None,
                is_active: true,
            })
            .collect()
    }

    fn value_counts(deck: &[Card]) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for card in deck {
            *counts.entry(card.value.as_str()).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn cards_start_face_down_and_unmatched() {
        let deck = generate_deck(4, &[]);
        assert!(deck.iter().all(|c| !c.matched && !c.face_up));
    }

    #[test]
    fn images_used_when_present() {
        let images = test_images(8);
        let deck = generate_deck(8, &images);
        assert!(deck.iter().all(|c| c.value.starts_with("/static/")));
    }

    #[test]
    fn image_pool_cycles_when_short() {
        // 6 pairs over 3 images: each URL backs two pairs, four cards.
        let images = test_images(3);
        let deck = generate_deck(6, &images);
        assert_eq!(deck.len(), 12);
        for (_, count) in value_counts(&deck) {
            assert_eq!(count, 4);
        }
    }

    #[test]
    fn shuffle_shows_no_positional_bias() {
        // With two pairs, each value should land at position 0 about
        // half the time. A fixed ordering would fail this decisively.
        let runs = 600;
        let mut first_counts: BTreeMap<String, usize> = BTreeMap::new();
        for _ in 0..runs {
            let deck = generate_deck(2, &[]);
            *first_counts.entry(deck[0].value.clone()).or_insert(0) += 1;
        }
        assert_eq!(first_counts.len(), 2);
        for (value, count) in first_counts {
            assert!(
                count > runs / 5 && count < runs * 4 / 5,
                "value {value} appeared {count}/{runs} times at position 0"
            );
        }
    }

    proptest! {
        #[test]
        fn deck_has_every_value_exactly_twice(pair_count in 1u32..=32) {
            let deck = generate_deck(pair_count, &[]);
            prop_assert_eq!(deck.len(), pair_count as usize * 2);
            for (_, count) in value_counts(&deck) {
                prop_assert_eq!(count, 2);
            }
        }

        #[test]
        fn image_decks_have_even_pairing(pair_count in 1u32..=16, image_count in 1usize..=16) {
            let images = test_images(image_count);
            let deck = generate_deck(pair_count, &images);
            prop_assert_eq!(deck.len(), pair_count as usize * 2);
            for (_, count) in value_counts(&deck) {
                prop_assert_eq!(count % 2, 0);
            }
        }
    }
}
