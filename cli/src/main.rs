use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use clap::{arg, Command};
use tempfile::NamedTempFile;

use crate::api::{Api, HttpClient};
use crate::config::{Config, DEFAULT_CONFIG_FILE};

mod api;
mod config;

fn cli() -> Command {
    Command::new("nanoctl")
        .about("Control panel for a nanoweb file server")
        .subcommand_required(true)
        .arg(
            arg!(-c --config <FILE> "Path of the config file")
                .required(false)
                .global(true),
        )
        .subcommand(Command::new("ls").about("List files stored on the server"))
        .subcommand(
            Command::new("status").about("Show server time, uptime, runtime and platform"),
        )
        .subcommand(
            Command::new("push")
                .about("Upload files to the server")
                .arg(arg!(<PATH> ... "Paths of files to upload"))
                .arg_required_else_help(true),
        )
        .subcommand(
            Command::new("pull")
                .about("Download a file from the server")
                .arg(arg!(<FILENAME> "Filename to download"))
                .arg_required_else_help(true),
        )
        .subcommand(
            Command::new("rm")
                .about("Delete a file stored on the server")
                .arg(arg!(<FILENAME> "Filename to delete"))
                .arg_required_else_help(true),
        )
        .subcommand(Command::new("ping").about("Check that the server is reachable"))
        .subcommand(Command::new("watch").about("Poll the server status periodically"))
}

fn ls(api: impl Api) -> Result<()> {
    for file in api.list()? {
        println!("{file}");
    }
    Ok(())
}

fn status(api: impl Api) -> Result<()> {
    let status = api.status()?;

    println!("Time:     {}", status.time);
    println!("Uptime:   {}", status.uptime);
    println!("Runtime:  {}", status.runtime);
    println!("Platform: {}", status.platform);

    Ok(())
}

/// Uploads every given path, keeps going past individual failures and
/// returns the number of files the server accepted.
fn push(paths: &[PathBuf], api: impl Api) -> Result<usize> {
    let mut success = 0;

    for path in paths {
        match push_one(path, &api) {
            Ok(()) => success += 1,
            Err(err) => eprintln!("Failed to upload {path:?}: {err:#}"),
        }
    }

    println!("{success} file(s) uploaded successfully.");

    if success > 0 {
        println!("Files on server:");
        for file in api.list()? {
            println!("  {file}");
        }
    }

    Ok(success)
}

fn push_one(path: &Path, api: &impl Api) -> Result<()> {
    let file = File::open(path)?;
    let filename = path
        .file_name()
        .ok_or(anyhow!("Filename not found in the path"))?
        .to_string_lossy();

    print!("Sending {filename} ({} bytes)... ", file.metadata()?.len());
    std::io::stdout().flush().ok();

    api.push(&filename, file)?;

    println!("OK");

    Ok(())
}

fn pull(filename: &str, download_dir: impl AsRef<Path>, api: impl Api) -> Result<()> {
    let temp_file = NamedTempFile::new()?;

    print!("Downloading file... ");
    std::io::stdout().flush().ok();

    api.pull(filename, temp_file.as_file())?;

    println!("OK");

    std::fs::create_dir_all(download_dir.as_ref())?;
    let new_name = download_dir.as_ref().join(filename);
    assert!(new_name.starts_with(download_dir));
    temp_file.persist(&new_name)?;

    println!("File saved to {new_name:?}");

    Ok(())
}

fn rm(filename: &str, api: impl Api) -> Result<()> {
    api.remove(filename)?;
    println!("Deleted {filename}");
    Ok(())
}

fn ping(api: impl Api) -> Result<()> {
    let started = Instant::now();
    api.ping()?;
    println!("pong ({} ms)", started.elapsed().as_millis());
    Ok(())
}

/// One poll tick: fetches the status and renders the line to display.
fn poll_status(api: &impl Api) -> Result<String> {
    let status = api.status()?;
    Ok(format!(
        "{} | up {} | {} | {}",
        status.time, status.uptime, status.runtime, status.platform
    ))
}

/// Status poll loop. Poll errors are reported and polling carries on,
/// so a rebooting server does not kill the watch.
fn watch(interval: Duration, api: impl Api) {
    loop {
        match poll_status(&api) {
            Ok(line) => println!("{line}"),
            Err(err) => eprintln!("Status poll failed: {err:#}"),
        }
        std::thread::sleep(interval);
    }
}

fn main() {
    let matches = cli().get_matches();
    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONFIG_FILE);
    let config = Config::load(config_path).expect("Unable to load config file");

    match matches.subcommand() {
        Some(("ls", _)) => ls(HttpClient::new(config.server_url, config.credentials))
            .expect("Failed to list files"),
        Some(("status", _)) => status(HttpClient::new(config.server_url, config.credentials))
            .expect("Failed to fetch server status"),
        Some(("push", sub_matches)) => {
            let paths: Vec<PathBuf> = sub_matches
                .get_many::<String>("PATH")
                .expect("Paths of files must be provided")
                .map(|path| PathBuf::from_str(path).expect("Unable to parse path"))
                .collect();
            push(
                &paths,
                HttpClient::new(config.server_url, config.credentials),
            )
            .expect("Failed to upload files");
        }
        Some(("pull", sub_matches)) => {
            let filename = sub_matches
                .get_one::<String>("FILENAME")
                .expect("Filename must be provided");
            pull(
                filename,
                config.download_dir,
                HttpClient::new(config.server_url, config.credentials),
            )
            .expect("Failed to download file")
        }
        Some(("rm", sub_matches)) => {
            let filename = sub_matches
                .get_one::<String>("FILENAME")
                .expect("Filename must be provided");
            rm(
                filename,
                HttpClient::new(config.server_url, config.credentials),
            )
            .expect("Failed to delete file")
        }
        Some(("ping", _)) => ping(HttpClient::new(config.server_url, config.credentials))
            .expect("Failed to ping server"),
        Some(("watch", _)) => {
            let interval = config.poll_interval();
            watch(
                interval,
                HttpClient::new(config.server_url, config.credentials),
            )
        }
        Some((cmd, _)) => unimplemented!("{cmd}"),
        None => unreachable!(),
    }
}
