//! Shuffled review order: every character once per round, and a new round
//! never opens with the character that closed the previous one.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use thiserror::Error;

use crate::db::operations::{self, Character};
use crate::db::Database;

const MAX_SESSIONS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundState {
    /// Characters of the current round remain in the deck.
    MidRound,
    /// The deck is empty; the next advance reshuffles.
    RoundBoundary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AdvanceError {
    #[error("字库中至少需要两个汉字才能切换。")]
    NotEnoughCharacters,
}

pub struct ReviewScheduler<T, R = StdRng> {
    items: Vec<T>,
    deck: VecDeque<T>,
    current: Option<T>,
    round: u64,
    rng: R,
}

impl<T: Clone + PartialEq> ReviewScheduler<T, StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }
}

impl<T: Clone + PartialEq> Default for ReviewScheduler<T, StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + PartialEq, R: Rng> ReviewScheduler<T, R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            items: Vec::new(),
            deck: VecDeque::new(),
            current: None,
            round: 0,
            rng,
        }
    }

    /// Replaces the session with `items` and draws the first card.
    pub fn activate(&mut self, items: Vec<T>) -> Option<&T> {
        self.items = items;
        self.deck.clear();
        self.current = None;
        self.round = 0;

        if self.items.is_empty() {
            return None;
        }

        self.start_round();
        self.current.as_ref()
    }

    /// Draws the next card. Needs at least two items; otherwise nothing changes.
    pub fn advance(&mut self) -> Result<&T, AdvanceError> {
        if self.items.len() < 2 {
            return Err(AdvanceError::NotEnoughCharacters);
        }

        match self.deck.pop_front() {
            Some(next) => self.current = Some(next),
            None => self.start_round(),
        }

        self.current.as_ref().ok_or(AdvanceError::NotEnoughCharacters)
    }

    fn start_round(&mut self) {
        let mut order = self.items.clone();
        order.shuffle(&mut self.rng);

        if order.len() > 1 && order.first() == self.current.as_ref() {
            order.swap(0, 1);
        }

        let mut deck = VecDeque::from(order);
        self.current = deck.pop_front();
        self.deck = deck;
        self.round += 1;
    }

    pub fn current(&self) -> Option<&T> {
        self.current.as_ref()
    }

    pub fn remaining(&self) -> usize {
        self.deck.len()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 1-based round number; 0 before activation or for an empty set.
    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn state(&self) -> RoundState {
        if self.deck.is_empty() {
            RoundState::RoundBoundary
        } else {
            RoundState::MidRound
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCard {
    pub session_id: String,
    pub character_set_id: String,
    pub current: Option<Character>,
    pub remaining: usize,
    pub total: usize,
    pub round: u64,
    pub state: RoundState,
}

#[derive(Debug, Error)]
pub enum ReviewSessionError {
    #[error("复习会话不存在。")]
    SessionNotFound,
    #[error("未找到指定ID的字库。")]
    SetNotFound,
    #[error("尚未设置默认字库。")]
    NoDefaultSet,
    #[error(transparent)]
    Advance(#[from] AdvanceError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

struct SessionEntry {
    character_set_id: String,
    scheduler: ReviewScheduler<Character>,
    last_used: u64,
}

impl SessionEntry {
    fn card(&self, session_id: &str) -> ReviewCard {
        ReviewCard {
            session_id: session_id.to_string(),
            character_set_id: self.character_set_id.clone(),
            current: self.scheduler.current().cloned(),
            remaining: self.scheduler.remaining(),
            total: self.scheduler.len(),
            round: self.scheduler.round(),
            state: self.scheduler.state(),
        }
    }
}

#[derive(Default)]
struct SessionTable {
    entries: HashMap<String, SessionEntry>,
    access_counter: u64,
}

impl SessionTable {
    fn touch(&mut self) -> u64 {
        self.access_counter += 1;
        self.access_counter
    }

    fn evict_if_needed(&mut self) {
        if self.entries.len() < MAX_SESSIONS {
            return;
        }
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(id, _)| id.clone());
        if let Some(id) = oldest {
            tracing::debug!(session_id = %id, "evicting idle review session");
            self.entries.remove(&id);
        }
    }
}

/// In-memory review sessions, one scheduler per session id.
#[derive(Default)]
pub struct ReviewSessions {
    table: Mutex<SessionTable>,
}

impl ReviewSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn start_for_set(
        &self,
        db: &Database,
        set_id: &str,
    ) -> Result<ReviewCard, ReviewSessionError> {
        let set = operations::get_character_set(db, set_id)
            .await?
            .ok_or(ReviewSessionError::SetNotFound)?;
        Ok(self.start(set_id, set.characters))
    }

    /// Starts on the set flagged as default.
    pub async fn start_for_default(&self, db: &Database) -> Result<ReviewCard, ReviewSessionError> {
        let set = operations::get_default_character_set(db)
            .await?
            .ok_or(ReviewSessionError::NoDefaultSet)?;
        self.start_for_set(db, &set.id).await
    }

    pub fn start(&self, set_id: &str, characters: Vec<Character>) -> ReviewCard {
        let session_id = uuid::Uuid::new_v4().to_string();
        let mut scheduler = ReviewScheduler::new();
        scheduler.activate(characters);

        let mut table = self.table.lock();
        table.evict_if_needed();
        let last_used = table.touch();
        let entry = SessionEntry {
            character_set_id: set_id.to_string(),
            scheduler,
            last_used,
        };
        let card = entry.card(&session_id);
        table.entries.insert(session_id.clone(), entry);

        tracing::debug!(%session_id, set_id, total = card.total, "review session started");
        card
    }

    /// Reading a session counts as use for eviction.
    pub fn get(&self, session_id: &str) -> Option<ReviewCard> {
        let mut table = self.table.lock();
        let last_used = table.touch();
        let entry = table.entries.get_mut(session_id)?;
        entry.last_used = last_used;
        Some(entry.card(session_id))
    }

    pub fn advance(&self, session_id: &str) -> Result<ReviewCard, ReviewSessionError> {
        let mut table = self.table.lock();
        let last_used = table.touch();
        let entry = table
            .entries
            .get_mut(session_id)
            .ok_or(ReviewSessionError::SessionNotFound)?;
        entry.last_used = last_used;
        entry.scheduler.advance()?;
        Ok(entry.card(session_id))
    }

    /// Returns `false` when the session did not exist.
    pub fn end(&self, session_id: &str) -> bool {
        self.table.lock().entries.remove(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.table.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn seeded<T: Clone + PartialEq>(seed: u64) -> ReviewScheduler<T, StdRng> {
        ReviewScheduler::with_rng(StdRng::seed_from_u64(seed))
    }

    fn character(id: &str, glyph: &str) -> Character {
        Character {
            id: id.to_string(),
            glyph: glyph.to_string(),
            pinyin: Vec::new(),
            character_set_id: "set".to_string(),
            position: 0,
            created_at: String::new(),
        }
    }

    #[test]
    fn test_activate_empty_set() {
        let mut scheduler = seeded::<u32>(1);
        assert!(scheduler.activate(Vec::new()).is_none());
        assert_eq!(scheduler.round(), 0);
        assert_eq!(scheduler.state(), RoundState::RoundBoundary);
        assert_eq!(scheduler.advance(), Err(AdvanceError::NotEnoughCharacters));
    }

    #[test]
    fn test_single_character_cannot_advance() {
        let mut scheduler = seeded(2);
        assert_eq!(scheduler.activate(vec!['你']), Some(&'你'));
        assert_eq!(scheduler.state(), RoundState::RoundBoundary);

        assert_eq!(scheduler.advance(), Err(AdvanceError::NotEnoughCharacters));
        assert_eq!(scheduler.current(), Some(&'你'));
        assert_eq!(scheduler.round(), 1);
        assert_eq!(scheduler.remaining(), 0);
    }

    #[test]
    fn test_activate_draws_first_card_and_keeps_rest_in_deck() {
        let mut scheduler = seeded(3);
        let first = *scheduler.activate(vec![1, 2, 3, 4]).unwrap();
        assert!((1..=4).contains(&first));
        assert_eq!(scheduler.remaining(), 3);
        assert_eq!(scheduler.state(), RoundState::MidRound);
    }

    #[test]
    fn test_every_round_covers_all_items() {
        let items: Vec<u32> = (0..7).collect();
        let mut scheduler = seeded(4);
        let mut draws = vec![*scheduler.activate(items.clone()).unwrap()];
        for _ in 0..(7 * 5 - 1) {
            draws.push(*scheduler.advance().unwrap());
        }

        for round in draws.chunks(7) {
            let seen: HashSet<_> = round.iter().copied().collect();
            assert_eq!(seen.len(), 7);
        }
        assert_eq!(scheduler.round(), 5);
        assert_eq!(scheduler.state(), RoundState::RoundBoundary);
    }

    #[test]
    fn test_round_boundary_never_repeats_previous_card() {
        for seed in 0..200 {
            let mut scheduler = seeded(seed);
            let mut previous = *scheduler.activate(vec!['a', 'b']).unwrap();
            for _ in 0..20 {
                let next = *scheduler.advance().unwrap();
                assert_ne!(next, previous, "seed {seed}");
                previous = next;
            }
        }
    }

    #[test]
    fn test_same_seed_same_order() {
        let items: Vec<u32> = (0..10).collect();
        let mut a = seeded(42);
        let mut b = seeded(42);
        assert_eq!(a.activate(items.clone()), b.activate(items));
        for _ in 0..25 {
            assert_eq!(a.advance(), b.advance());
        }
    }

    #[test]
    fn test_reactivation_resets_round() {
        let mut scheduler = seeded(5);
        scheduler.activate(vec![1, 2, 3]);
        scheduler.advance().unwrap();
        scheduler.advance().unwrap();
        scheduler.advance().unwrap();
        assert_eq!(scheduler.round(), 2);

        scheduler.activate(vec![9, 8]);
        assert_eq!(scheduler.round(), 1);
        assert_eq!(scheduler.len(), 2);
        assert!(matches!(scheduler.current(), Some(9) | Some(8)));
    }

    #[test]
    fn test_sessions_start_advance_end() {
        let sessions = ReviewSessions::new();
        let card = sessions.start("set", vec![character("1", "你"), character("2", "好")]);
        assert_eq!(card.total, 2);
        assert_eq!(card.round, 1);
        let first = card.current.clone().unwrap();

        let next = sessions.advance(&card.session_id).unwrap();
        assert_ne!(next.current.unwrap(), first);
        assert_eq!(next.state, RoundState::RoundBoundary);

        assert!(sessions.get(&card.session_id).is_some());
        assert!(sessions.end(&card.session_id));
        assert!(!sessions.end(&card.session_id));
        assert!(matches!(
            sessions.advance(&card.session_id),
            Err(ReviewSessionError::SessionNotFound)
        ));
    }

    #[test]
    fn test_session_with_one_character_reports_not_enough() {
        let sessions = ReviewSessions::new();
        let card = sessions.start("set", vec![character("1", "你")]);
        let err = sessions.advance(&card.session_id).unwrap_err();
        assert!(matches!(
            err,
            ReviewSessionError::Advance(AdvanceError::NotEnoughCharacters)
        ));
        let after = sessions.get(&card.session_id).unwrap();
        assert_eq!(after.current, card.current);
        assert_eq!(after.round, card.round);
    }

    #[test]
    fn test_polled_session_survives_eviction() {
        let sessions = ReviewSessions::new();
        let polled = sessions.start("set", vec![character("1", "你")]);
        let idle = sessions.start("set", vec![character("2", "好")]);
        for _ in 2..MAX_SESSIONS {
            sessions.start("set", Vec::new());
        }
        assert_eq!(sessions.len(), MAX_SESSIONS);

        assert!(sessions.get(&polled.session_id).is_some());
        sessions.start("set", Vec::new());

        assert_eq!(sessions.len(), MAX_SESSIONS);
        assert!(sessions.get(&polled.session_id).is_some());
        assert!(sessions.get(&idle.session_id).is_none());
    }
}
