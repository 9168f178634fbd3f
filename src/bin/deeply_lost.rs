//! Console front-end: list home islands, rename them, teleport to one.
//!
//! Run with: cargo run --bin deeply-lost -- --save <path>/Save.json [--mode all] [--offset 1.5]

use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use deeply_lost::alias::{default_store_path, AliasStore, JsonFileStore, MemoryAliasStore};
use deeply_lost::config::StartupConfig;
use deeply_lost::document::SAVE_FILE_NAME;
use deeply_lost::index::IslandCandidate;
use deeply_lost::session::{spawn_session, Notice, Request, Response, Session, SessionHandle};

const HELP: &str = "\
commands:
  list                  show home islands
  items <n>             objects placed on island n
  rename <n> <alias>    give island n a name (empty name clears it)
  teleport <n>          move the player to island n
  rescan                read the save again
  open <path>           switch to another Save.json
  status                save path and watch state
  quit";

#[derive(Debug, PartialEq)]
enum Command {
    List,
    Items(usize),
    Rename(usize, String),
    Teleport(usize),
    Rescan,
    Open(PathBuf),
    Status,
    Yes,
    No,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let island = |arg: &str| -> Result<usize, String> {
        match arg.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n - 1),
            _ => Err(format!("expected an island number, got {arg:?}")),
        }
    };

    match word.to_ascii_lowercase().as_str() {
        "list" | "ls" => Ok(Command::List),
        "items" | "?" => island(rest).map(Command::Items),
        "rename" => {
            let (n, alias) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            Ok(Command::Rename(island(n)?, alias.trim().to_string()))
        }
        "teleport" | "tp" => island(rest).map(Command::Teleport),
        "rescan" => Ok(Command::Rescan),
        "open" if !rest.is_empty() => Ok(Command::Open(PathBuf::from(rest))),
        "status" => Ok(Command::Status),
        "y" | "yes" => Ok(Command::Yes),
        "n" | "no" => Ok(Command::No),
        "help" | "h" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        "" => Err(String::new()),
        _ => Err(format!("unknown command {word:?}, try `help`")),
    }
}

/// Question the console is waiting on.
enum Pending {
    Teleport(usize),
    Rescan,
}

struct Console {
    handle: SessionHandle,
    islands: Vec<IslandCandidate>,
    pending: Option<Pending>,
}

impl Console {
    async fn send(&mut self, request: Request) -> Option<Response> {
        let response = self.handle.request(request).await;
        if response.is_none() {
            eprintln!("session ended");
        }
        response
    }

    fn show_islands(&mut self, islands: Vec<IslandCandidate>) {
        self.islands = islands;
        if self.islands.is_empty() {
            println!("No islands with a campfire found!");
            println!("Place a campfire on an island to enable it for teleportation.");
            println!("If the problem persists this version may not understand your save.");
            return;
        }
        for (i, island) in self.islands.iter().enumerate() {
            println!(
                "{:>3}  {:<24} origin ({}, {})  spawn ({:.2}, {:.2}, {:.2})  {} objects",
                i + 1,
                island.label(),
                island.origin.x,
                island.origin.z,
                island.reference.x,
                island.reference.y,
                island.reference.z,
                island.item_count()
            );
        }
    }

    fn print_response(&mut self, response: Response) {
        match response {
            Response::Candidates(islands) => self.show_islands(islands),
            Response::Items { label, items } => {
                println!("{label}:");
                for (name, count) in items {
                    println!("  {count:>4}  {name}");
                }
            }
            Response::Renamed {
                index,
                label,
                alias,
            } => {
                if let Some(island) = self.islands.get_mut(index) {
                    island.alias = alias;
                }
                println!("island {} is now {label:?}", index + 1);
            }
            Response::Relocated { island, backup } => {
                println!("Teleported to {island:?}.");
                println!("Quit your game if needed and press \"Load Game\" to spawn on the island.");
                println!("A backup of the previous save is stored at: {}", backup.display());
            }
            Response::Answered(Some(islands)) => self.show_islands(islands),
            Response::Answered(None) => {}
            Response::Status {
                save_path,
                watch,
                candidates,
            } => {
                match save_path {
                    Some(path) => println!("save: {}", path.display()),
                    None => println!("save: none"),
                }
                println!("watch: {watch:?}");
                println!("islands: {candidates}");
            }
            Response::Closed => {}
            Response::Failed(e) => {
                eprintln!("error: {e}");
                if let Some(backup) = e.backup_path() {
                    eprintln!("restore your save from {}", backup.display());
                }
            }
        }
    }

    /// Returns false when the console should exit.
    async fn on_line(&mut self, line: &str) -> bool {
        let command = match parse_command(line) {
            Ok(command) => command,
            Err(message) => {
                if !message.is_empty() {
                    eprintln!("{message}");
                }
                return true;
            }
        };

        let pending = self.pending.take();
        let request = match (command, pending) {
            (Command::Yes, Some(Pending::Teleport(index))) => Request::Relocate(index),
            (Command::No, Some(Pending::Teleport(_))) => {
                println!("teleport aborted");
                return true;
            }
            (Command::Yes, Some(Pending::Rescan)) => Request::Answer(true),
            (Command::No, Some(Pending::Rescan)) => Request::Answer(false),
            (Command::Yes | Command::No, None) => {
                println!("nothing to answer");
                return true;
            }
            (Command::Teleport(index), _) => {
                let Some(island) = self.islands.get(index) else {
                    eprintln!("no island {}", index + 1);
                    return true;
                };
                println!("Teleport to {:?}? [y/n]", island.label());
                self.pending = Some(Pending::Teleport(index));
                return true;
            }
            (Command::Help, _) => {
                println!("{HELP}");
                return true;
            }
            (Command::List, _) => Request::List,
            (Command::Items(index), _) => Request::Items(index),
            (Command::Rename(index, alias), _) => Request::Rename { index, alias },
            (Command::Rescan, _) => Request::Scan,
            (Command::Open(path), _) => Request::Open { path, remember: false },
            (Command::Status, _) => Request::Status,
            (Command::Quit, _) => {
                self.send(Request::Quit).await;
                return false;
            }
        };

        match self.send(request).await {
            Some(response) => {
                self.print_response(response);
                true
            }
            None => false,
        }
    }

    fn on_notice(&mut self, notice: Notice) {
        match notice {
            Notice::RescanRequested { path } => {
                if let Some(Pending::Teleport(_)) = self.pending {
                    println!("teleport question dropped");
                }
                println!(
                    "{} was updated externally, rescan for new islands? [y/n]",
                    path.display()
                );
                self.pending = Some(Pending::Rescan);
            }
            Notice::WatchDisabled { reason } => {
                println!("{reason}");
                println!("Changes to the save are no longer noticed, use `rescan` by hand.");
            }
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn open_preferences(use_preferences: bool) -> Box<dyn AliasStore + Send> {
    if !use_preferences {
        return Box::new(MemoryAliasStore::new());
    }
    match JsonFileStore::open(default_store_path()) {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!(error = %e, "preferences_unavailable");
            Box::new(MemoryAliasStore::new())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let config = StartupConfig::from_args(std::env::args()).unwrap_or_else(|e| e.exit());

    let session = Session::new(config.index_options(), open_preferences(config.use_preferences));
    let initial = match &config.save_path {
        Some(path) => Some((path.clone(), config.remember)),
        None => session.remembered_path().map(|path| (path, false)),
    };

    let handle = spawn_session(session, config.watch);
    let mut console = Console {
        handle,
        islands: Vec::new(),
        pending: None,
    };

    match initial {
        Some((path, remember)) => {
            if let Some(response) = console.send(Request::Open { path, remember }).await {
                console.print_response(response);
            }
        }
        None => println!("No save game selected, use `open <path>/{SAVE_FILE_NAME}`."),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    console.send(Request::Quit).await;
                    break;
                };
                if !console.on_line(&line).await {
                    break;
                }
            }
            Some(notice) = console.handle.notices.recv() => console.on_notice(notice),
        }
    }
    Ok(())
}
