use std::io::Write;
use std::sync::Mutex;

use super::emotion::Emotion;
use super::session::{ Cue, Renderer, DEFAULT_BOT_NAME };
use crate::models::conversation::Role;

const BELL: &str = "\x07";

/// Draws the chat on stdout. Cues ring the terminal bell.
pub struct TerminalRenderer {
    sounds: bool,
    vibrate: bool,
    bot_name: Mutex<String>,
}

impl TerminalRenderer {
    pub fn new(sounds: bool, vibrate: bool) -> Self {
        Self { sounds, vibrate, bot_name: Mutex::new(DEFAULT_BOT_NAME.to_string()) }
    }

    fn bot_name(&self) -> String {
        self.bot_name
            .lock()
            .map(|name| name.clone())
            .unwrap_or_else(|_| DEFAULT_BOT_NAME.to_string())
    }

    fn ring(&self) {
        print!("{}", BELL);
        let _ = std::io::stdout().flush();
    }
}

impl Renderer for TerminalRenderer {
    fn message(&self, role: Role, text: &str) {
        match role {
            Role::User => println!("{} Tú: {}", role.marker(), text),
            Role::Bot => println!("{} {}: {}", role.marker(), self.bot_name(), text),
        }
    }

    fn notice(&self, text: &str) {
        println!("  · {}", text);
    }

    fn typing(&self, active: bool) {
        if active {
            println!("  {} está escribiendo...", self.bot_name());
        }
    }

    fn cue(&self, cue: Cue) {
        let enabled = match cue {
            Cue::Vibrate => self.vibrate,
            Cue::Intro | Cue::Send | Cue::Receive => self.sounds,
        };
        if enabled {
            self.ring();
        }
    }

    fn avatar(&self, path: &str) {
        log::debug!("Avatar -> {}", path);
    }

    fn brand(&self, name: &str) {
        if let Ok(mut current) = self.bot_name.lock() {
            *current = name.to_string();
        }
        println!("=== {} ===", name);
    }

    fn clear(&self) {
        print!("\x1b[2J\x1b[H");
        let _ = std::io::stdout().flush();
    }
}

/// A parsed line typed at the chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Message(String),
    Clear,
    Forget,
    History,
    Export,
    Mood(Emotion),
    Name(String),
    Help,
    Quit,
    Unknown(String),
}

pub const HELP: &str = "\
Comandos:
  /borrar          borra la conversación
  /olvidar         elimina el historial guardado
  /historial       muestra el historial
  /exportar        guarda la conversación en un archivo
  /animo <estado>  muestra un estado (neutral, sad, stressed, happy)
  /nombre <nombre> cambia el nombre del asistente
  /ayuda           muestra esta ayuda
  /salir           termina la sesión";

pub fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix('/') else {
        return Input::Message(trimmed.to_string());
    };

    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };

    match name.to_lowercase().as_str() {
        "borrar" | "clear" => Input::Clear,
        "olvidar" | "forget" => Input::Forget,
        "historial" | "history" => Input::History,
        "exportar" | "export" => Input::Export,
        "animo" | "mood" =>
            match rest.parse::<Emotion>() {
                Ok(emotion) => Input::Mood(emotion),
                Err(e) => Input::Unknown(e),
            }
        "nombre" | "name" => Input::Name(rest.to_string()),
        "ayuda" | "help" => Input::Help,
        "salir" | "quit" | "exit" => Input::Quit,
        other => Input::Unknown(format!("Comando desconocido: /{}", other)),
    }
}

pub fn is_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "s" | "si" | "sí" | "y" | "yes")
}
