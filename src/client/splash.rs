use chrono::{ Datelike, Local, Utc };
use log::warn;
use std::str::FromStr;
use std::time::Duration;

use super::{ Cue, Renderer };
use crate::history::HistoryStore;

pub const SPLASH_PHRASES: [&str; 6] = [
    "Hoy es un buen día para escucharte.",
    "Tu bienestar es importante.",
    "Respira... estoy contigo.",
    "Un paso a la vez.",
    "No tienes que cargar todo solo.",
    "Aquí estoy, escucha lo que sientes.",
];

pub const LAST_VISIT_KEY: &str = "amiko_last_visit";
pub const INTRO_REPLAY_GAP_MS: i64 = 5000;

pub fn daily_phrase_index(day_of_month: u32) -> usize {
    (day_of_month as usize) % SPLASH_PHRASES.len()
}

pub fn daily_phrase<D: Datelike>(date: &D) -> &'static str {
    SPLASH_PHRASES[daily_phrase_index(date.day())]
}

/// Decides whether the intro cue plays and records this visit.
/// Visits closer than `INTRO_REPLAY_GAP_MS` to the previous one stay silent.
pub async fn should_play_intro(store: &dyn HistoryStore, now_ms: i64) -> bool {
    let last_visit = match store.get_item(LAST_VISIT_KEY).await {
        Ok(value) => value.and_then(|raw| raw.trim().parse::<i64>().ok()),
        Err(e) => {
            warn!("Could not read last visit: {}", e);
            None
        }
    };

    let play = match last_visit {
        Some(last) => now_ms - last > INTRO_REPLAY_GAP_MS,
        None => true,
    };

    if let Err(e) = store.set_item(LAST_VISIT_KEY, &now_ms.to_string()).await {
        warn!("Could not record visit: {}", e);
    }
    play
}

/// Intro screen shown before the chat opens.
pub struct Splash {
    pub loader: Duration,
    pub rotate_every: Duration,
}

impl Default for Splash {
    fn default() -> Self {
        Self {
            loader: Duration::from_millis(3000),
            rotate_every: Duration::from_millis(1800),
        }
    }
}

impl Splash {
    pub async fn play(&self, renderer: &dyn Renderer, store: &dyn HistoryStore) {
        renderer.notice(daily_phrase(&Local::now()));
        if should_play_intro(store, Utc::now().timestamp_millis()).await {
            renderer.cue(Cue::Intro);
        }

        let mut phrases = SPLASH_PHRASES.iter().cycle();
        let deadline = tokio::time::Instant::now() + self.loader;
        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + self.rotate_every,
            self.rotate_every
        );
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => break,
                _ = ticker.tick() => {
                    if let Some(phrase) = phrases.next() {
                        renderer.notice(phrase);
                    }
                }
            }
        }
    }
}

/// What the visitor picks on the welcome screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChoice {
    Guest,
    Login,
    Register,
}

impl AuthChoice {
    pub fn notice(&self) -> &'static str {
        match self {
            AuthChoice::Guest => "Has elegido continuar en modo fantasma 👻.",
            AuthChoice::Login => "Opción 'Iniciar sesión' seleccionada (pendiente de implementar).",
            AuthChoice::Register => "Opción 'Registrarse' seleccionada (pendiente de implementar).",
        }
    }
}

impl FromStr for AuthChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "1" | "guest" | "fantasma" => Ok(AuthChoice::Guest),
            "2" | "login" => Ok(AuthChoice::Login),
            "3" | "register" => Ok(AuthChoice::Register),
            other => Err(format!("Unknown option: '{}'", other)),
        }
    }
}
