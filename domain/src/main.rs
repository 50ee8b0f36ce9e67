use std::env;
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use domain::adapters::memory_repo::InMemoryProductRepo;
use domain::seed::seed_products;
use domain::service::GreetingGenerator;
use domain::{ProductInput, ProductRepository, SystemClock};

fn print_usage() {
    eprintln!(
        "{}\n\nUsage:\n  domain greetings [<count>]\n  domain create <message>\n  domain products [--add <name> <price>]\n\nNotes:\n  - This demo CLI keeps everything in memory; nothing is persisted across runs.",
        domain::about()
    );
}

fn epoch_secs(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

fn run() -> Result<(), String> {
    let mut args = env::args().skip(1); // skip program name

    let Some(cmd) = args.next() else {
        print_usage();
        return Ok(());
    };

    let generator = GreetingGenerator::new(SystemClock);

    match cmd.as_str() {
        "greetings" => {
            // Each round regenerates the list, so ids keep climbing.
            let rounds = match args.next() {
                Some(n) => n
                    .parse::<usize>()
                    .map_err(|_| format!("invalid count: {}", n))?,
                None => 1,
            };
            for _ in 0..rounds {
                for g in generator.list() {
                    println!("{}\t{}\t{}", g.id, epoch_secs(g.timestamp), g.message);
                }
            }
            Ok(())
        }
        "create" => {
            let Some(message) = args.next() else {
                return Err("missing <message> for create".into());
            };
            let g = generator.create(message);
            println!("{}\t{}\t{}", g.id, epoch_secs(g.timestamp), g.message);
            Ok(())
        }
        "products" => {
            let repo = InMemoryProductRepo::new();
            seed_products(&repo).map_err(|e| format!("seed failed: {}", e))?;

            let rest: Vec<String> = args.collect();
            match rest.as_slice() {
                [] => {}
                [flag, name, price] if flag == "--add" => {
                    let price: f64 = price
                        .parse()
                        .map_err(|_| format!("invalid price: {}", price))?;
                    repo.save(ProductInput::new(name.clone(), price))
                        .map_err(|e| format!("save failed: {}", e))?;
                }
                _ => return Err("usage: products [--add <name> <price>]".into()),
            }

            let products = repo
                .find_all()
                .map_err(|e| format!("list failed: {}", e))?;
            for p in products {
                println!("{}\t{}\t{:.2}", p.id, p.name, p.price);
            }
            Ok(())
        }
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}
