pub mod emotion;
pub mod replier;
pub mod session;
pub mod splash;
pub mod terminal;

pub use self::replier::{ MockReplier, RemoteReplier, Replier };
pub use self::session::{ ChatSession, Cue, Renderer, SendOutcome, SessionOptions };

use log::{ info, warn };
use std::error::Error;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{ AsyncBufReadExt, BufReader, Lines, Stdin };

use crate::cli::ChatArgs;
use crate::history::initialize_history_store;
use splash::{ AuthChoice, Splash };
use terminal::{ is_confirmation, parse_input, Input, TerminalRenderer, HELP };

type StdinLines = Lines<BufReader<Stdin>>;

async fn prompt_line(
    lines: &mut StdinLines,
    prompt: &str
) -> Result<Option<String>, Box<dyn Error + Send + Sync>> {
    print!("{}", prompt);
    std::io::stdout().flush()?;
    Ok(lines.next_line().await?)
}

/// Interactive chat on the terminal until `/salir` or end of input.
pub async fn run_chat(args: ChatArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    let store = initialize_history_store(&args.history)?;
    let replier: Arc<dyn Replier> = if args.mock {
        info!("Answering locally with canned replies");
        Arc::new(MockReplier::default())
    } else {
        let remote = RemoteReplier::new(&args.backend_url)?;
        info!("Sending messages to {}", remote.endpoint());
        Arc::new(remote)
    };
    let renderer = Arc::new(TerminalRenderer::new(!args.no_sounds, args.vibrate));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let mut auth = None;
    if !args.skip_splash {
        Splash::default().play(renderer.as_ref(), store.as_ref()).await;
        println!("1) Continuar como invitado  2) Iniciar sesión  3) Registrarse");
        let answer = prompt_line(&mut lines, "> ").await?.unwrap_or_default();
        auth = Some(answer.parse::<AuthChoice>().unwrap_or(AuthChoice::Guest));
    }

    let options = SessionOptions {
        personality: args.personality.clone(),
        bot_name: args.bot_name.clone(),
        vibrate: args.vibrate,
    };
    let session = ChatSession::start(store, replier, renderer.clone(), options).await;
    if let Some(choice) = auth {
        session.choose_auth(choice);
    }

    loop {
        let Some(line) = prompt_line(&mut lines, "> ").await? else {
            break;
        };

        match parse_input(&line) {
            Input::Message(text) => {
                session.send(&text).await;
            }
            Input::Clear => {
                let answer = prompt_line(
                    &mut lines,
                    "¿Seguro que deseas borrar la conversación? (s/N) "
                ).await?;
                if answer.as_deref().is_some_and(is_confirmation) {
                    session.clear_conversation().await;
                }
            }
            Input::Forget => {
                let answer = prompt_line(&mut lines, "¿Eliminar historial emocional? (s/N) ").await?;
                if answer.as_deref().is_some_and(is_confirmation) {
                    match session.forget_history().await {
                        Ok(()) => println!("  · Historial eliminado."),
                        Err(e) => warn!("Could not forget history: {}", e),
                    }
                }
            }
            Input::History => {
                for entry in session.history_lines().await {
                    println!("  {}", entry);
                }
            }
            Input::Export => {
                match session.export_transcript(&args.transcript_dir).await {
                    Ok(path) => println!("  · Conversación exportada a {}", path.display()),
                    Err(e) => warn!("Could not export transcript: {}", e),
                }
            }
            Input::Mood(emotion) => session.show_mood(emotion),
            Input::Name(name) => {
                session.set_bot_name(&name);
            }
            Input::Help => println!("{}", HELP),
            Input::Quit => {
                break;
            }
            Input::Unknown(message) => println!("  · {}", message),
        }
    }

    info!("Chat session closed");
    Ok(())
}
