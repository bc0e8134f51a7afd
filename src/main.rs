use chembal::{balance_equation, calculate_molar_mass};
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::process::ExitCode;

fn print_usage() {
    eprintln!("usage: chembal [--charge] [--json] \"<equation>\"");
    eprintln!("       chembal --mass \"<formula>\"");
    eprintln!();
    eprintln!("examples:");
    eprintln!("  chembal \"C3H8 + O2 -> CO2 + H2O\"");
    eprintln!("  chembal --charge \"Ag^+ + Cl^- -> AgCl\"");
    eprintln!("  chembal --mass \"CuSO4*5H2O\"");
}

fn main() -> ExitCode {
    TermLogger::init(
        LevelFilter::Warn,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .ok();

    let mut include_charge = false;
    let mut as_json = false;
    let mut mass_mode = false;
    let mut inputs: Vec<String> = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--charge" => include_charge = true,
            "--json" => as_json = true,
            "--mass" => mass_mode = true,
            "--help" | "-h" => {
                print_usage();
                return ExitCode::SUCCESS;
            }
            _ => inputs.push(arg),
        }
    }
    if inputs.is_empty() {
        print_usage();
        return ExitCode::FAILURE;
    }
    let input = inputs.join(" ");

    if mass_mode {
        return match calculate_molar_mass(&input) {
            Ok(mass) => {
                println!("{mass:.3} g/mol");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::FAILURE
            }
        };
    }

    match balance_equation(&input, include_charge) {
        Ok(balanced) => {
            if as_json {
                match serde_json::to_string_pretty(&balanced) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        eprintln!("error: {e}");
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                balanced.pretty_print();
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("could not balance: {e}");
            ExitCode::FAILURE
        }
    }
}
