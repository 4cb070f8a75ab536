use std::io::{self, Write};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use peer_scoring::info::encode_peer_list;
use peer_scoring::{
    AddressBlock, Clock, EventType, ManualClock, NodeId, PeerScoringManager, ScoringConfig, Timestamp,
};

struct Session {
    manager: PeerScoringManager,
    clock: Arc<ManualClock>,
}

impl Session {
    fn new(config: &ScoringConfig) -> peer_scoring::Result<Self> {
        let clock = Arc::new(ManualClock::new(Timestamp(0)));
        let manager = PeerScoringManager::from_config(config)?.with_clock(clock.clone());
        Ok(Session { manager, clock })
    }

    /// `-` stands for an absent key.
    fn parse_node(who: &str) -> Option<NodeId> {
        match who {
            "-" => None,
            _ => Some(NodeId::from_public_key(who.as_bytes())),
        }
    }

    fn parse_address(s: &str) -> Result<Option<IpAddr>, String> {
        match s {
            "-" => Ok(None),
            _ => s
                .parse()
                .map(Some)
                .map_err(|e| format!("bad ADDRESS {}: {}", s, e)),
        }
    }

    fn cmd_event(&mut self, who: &str, address: &str, event: &str) {
        let node = Self::parse_node(who);
        let address = match Self::parse_address(address) {
            Ok(a) => a,
            Err(e) => {
                eprintln!("{}", e);
                return;
            }
        };
        let event: EventType = match event.parse() {
            Ok(e) => e,
            Err(e) => {
                eprintln!("{}", e);
                return;
            }
        };

        if node.is_none() && address.is_none() {
            eprintln!("need at least one of WHO and ADDRESS");
            return;
        }
        self.manager.record_event(node.as_ref(), address, event);
    }

    fn cmd_rep(&self, who: &str) {
        let Some(node) = Self::parse_node(who) else {
            eprintln!("usage: rep WHO");
            return;
        };
        let scoring = self.manager.peer_scoring(&node);
        println!(
            "node {} ({}): good={} score={} punishments={}",
            who,
            node,
            self.manager.has_good_reputation(&node),
            scoring.score(),
            scoring.punishment_counter()
        );
    }

    fn cmd_rep_addr(&self, address: &str) {
        let address: IpAddr = match address.parse() {
            Ok(a) => a,
            Err(e) => {
                eprintln!("bad ADDRESS {}: {}", address, e);
                return;
            }
        };
        let scoring = self.manager.address_scoring(address);
        println!(
            "address {}: good={} score={} punishments={}",
            address,
            self.manager.has_good_reputation_address(address),
            scoring.score(),
            scoring.punishment_counter()
        );
    }

    fn cmd_ban(&mut self, target: &str, ban: bool) {
        if target.contains('/') {
            let block = match AddressBlock::parse(target) {
                Ok(b) => b,
                Err(e) => {
                    eprintln!("{}", e);
                    return;
                }
            };
            let changed = if ban {
                self.manager.add_banned_address_block(block)
            } else {
                self.manager.remove_banned_address_block(&block)
            };
            println!("{} {}: {}", if ban { "ban" } else { "unban" }, block, changed);
            return;
        }

        let address: IpAddr = match target.parse() {
            Ok(a) => a,
            Err(e) => {
                eprintln!("bad ADDRESS {}: {}", target, e);
                return;
            }
        };
        let changed = if ban {
            self.manager.add_banned_address(address)
        } else {
            self.manager.remove_banned_address(address)
        };
        println!("{} {}: {}", if ban { "ban" } else { "unban" }, address, changed);
    }

    fn cmd_peers(&self) {
        match encode_peer_list(&self.manager.peers_information()) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("encode failed: {}", e),
        }
    }

    fn cmd_advance(&self, ms: &str) {
        match ms.parse::<u64>() {
            Ok(ms) => {
                self.clock.advance(Duration::from_millis(ms));
                println!("now {:?}", self.clock.now());
            }
            Err(e) => eprintln!("bad MILLIS {}: {}", ms, e),
        }
    }
}

fn print_banner() {
    println!("Peer Scoring REPL");
    println!("WHO is any node label, ADDRESS an IP; use - for absent");
    println!("commands:");
    println!("  event WHO ADDRESS EVENT");
    println!("  rep WHO");
    println!("  rep_addr ADDRESS");
    println!("  ban ADDRESS|CIDR");
    println!("  unban ADDRESS|CIDR");
    println!("  banned");
    println!("  clear WHO");
    println!("  clear_addr ADDRESS");
    println!("  punishment MILLIS");
    println!("  advance MILLIS");
    println!("  peers");
    println!("  events");
    println!("  help");
    println!("  quit / exit");
    println!("—");
}

fn load_config() -> peer_scoring::Result<ScoringConfig> {
    match std::env::args().nth(1) {
        Some(path) => ScoringConfig::from_file(path),
        None => Ok(ScoringConfig::default()),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let config = match load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("config error: {}", e);
            std::process::exit(1);
        }
    };
    let mut session = match Session::new(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("config error: {}", e);
            std::process::exit(1);
        }
    };

    let stdin = io::stdin();
    print_banner();

    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            break;
        }

        let mut line = String::new();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0];

        match cmd {
            "quit" | "exit" => break,

            "help" => print_banner(),

            "event" => {
                if parts.len() != 4 {
                    eprintln!("usage: event WHO ADDRESS EVENT");
                } else {
                    session.cmd_event(parts[1], parts[2], parts[3]);
                }
            }

            "rep" => {
                if parts.len() != 2 {
                    eprintln!("usage: rep WHO");
                } else {
                    session.cmd_rep(parts[1]);
                }
            }

            "rep_addr" => {
                if parts.len() != 2 {
                    eprintln!("usage: rep_addr ADDRESS");
                } else {
                    session.cmd_rep_addr(parts[1]);
                }
            }

            "ban" | "unban" => {
                if parts.len() != 2 {
                    eprintln!("usage: {} ADDRESS|CIDR", cmd);
                } else {
                    session.cmd_ban(parts[1], cmd == "ban");
                }
            }

            "banned" => {
                for address in session.manager.banned_addresses() {
                    println!("  {}", address);
                }
            }

            "clear" => {
                match (parts.len(), parts.get(1).and_then(|w| Session::parse_node(w))) {
                    (2, Some(node)) => println!("cleared: {}", session.manager.clear_peer_scoring(&node)),
                    _ => eprintln!("usage: clear WHO"),
                }
            }

            "clear_addr" => {
                match parts.get(1).map(|a| a.parse::<IpAddr>()) {
                    Some(Ok(address)) if parts.len() == 2 => {
                        println!("cleared: {}", session.manager.clear_address_scoring(address))
                    }
                    _ => eprintln!("usage: clear_addr ADDRESS"),
                }
            }

            "punishment" => {
                match parts.get(1).map(|ms| ms.parse::<u64>()) {
                    Some(Ok(ms)) if parts.len() == 2 => {
                        session.manager.set_punishment_duration(Duration::from_millis(ms))
                    }
                    _ => eprintln!("usage: punishment MILLIS"),
                }
            }

            "advance" => {
                if parts.len() != 2 {
                    eprintln!("usage: advance MILLIS");
                } else {
                    session.cmd_advance(parts[1]);
                }
            }

            "peers" => session.cmd_peers(),

            "events" => {
                for event in EventType::ALL {
                    println!("  {}", event);
                }
            }

            _ => {
                eprintln!("unknown command \"{}\"", cmd);
            }
        }
    }
}
