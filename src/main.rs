use std::error::Error;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use clap::{ArgAction, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use rand::rngs::OsRng;
use rand::RngCore;
use crypt_rsa::{padding, Key, KeyGenOptions, KeyPair, Params, RsaError, CONFIG_DEF, RSA};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunMode {
    Generate,
    Encode,
    Decode,
    Sign,
    Verify,
    Test,
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generate" => Ok(RunMode::Generate),
            "encode" => Ok(RunMode::Encode),
            "decode" => Ok(RunMode::Decode),
            "sign" => Ok(RunMode::Sign),
            "verify" => Ok(RunMode::Verify),
            "test" => Ok(RunMode::Test),
            _ => Err(format!("Unknown run mode `{}`! available: generate(default), encode, decode, sign, verify, test", s)),
        }
    }
}

#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(short, long, value_parser, default_value = CONFIG_DEF.mode.as_str(), help = "Run mode")]
    mode: String,
    #[clap(short, long, value_parser, default_value = CONFIG_DEF.key.as_str(), help = "Key path, generate/detect `path' and `path.pub'")]
    key: String,
    #[clap(short, long, value_parser, default_value = CONFIG_DEF.input.as_str(), help = "Input filename")]
    input: String,
    #[clap(short, long, value_parser, default_value = CONFIG_DEF.output.as_str(), help = "Output filename")]
    output: String,
    #[clap(long, value_parser, default_value = CONFIG_DEF.signature.as_str(), help = "Signature file checked in verify mode")]
    signature: String,
    #[clap(short, long, value_parser, default_value_t = CONFIG_DEF.bits, help = "Modulus bits of generated keys")]
    bits: usize,
    #[clap(short, long, value_parser, default_value_t = CONFIG_DEF.rounds, help = "Miller Rabin calculate rounds")]
    rounds: u32,
    #[clap(short, long, value_parser, default_value_t = CONFIG_DEF.threads, help = "Calculate in <THREADS> threads")]
    threads: usize,
    #[clap(short, long, action = ArgAction::SetTrue, default_value_t = CONFIG_DEF.silent, help = "Disable log output")]
    silent: bool,
}

impl Args {
    fn public_key_path(&self) -> String {
        self.key.clone() + ".pub"
    }

    fn reader(&self) -> io::Result<Box<dyn Read>> {
        Ok(match self.input.as_str() {
            "stdin" => Box::new(io::stdin()),
            f => Box::new(File::open(f)?),
        })
    }

    fn writer(&self) -> io::Result<Box<dyn Write>> {
        Ok(match self.output.as_str() {
            "stdout" => Box::new(io::stdout()),
            f => Box::new(File::create(f)?),
        })
    }

    fn read_input(&self) -> io::Result<Vec<u8>> {
        let mut data = Vec::new();
        self.reader()?.read_to_end(&mut data)?;
        Ok(data)
    }

    fn write_output(&self, data: &[u8]) -> io::Result<()> {
        let mut writer = self.writer()?;
        writer.write_all(data)?;
        writer.flush()
    }

    fn load_public_key(&self) -> Result<Key, Box<dyn Error>> {
        let text = fs::read_to_string(self.public_key_path())?;
        Ok(Key::deserialize(text.trim())?)
    }

    fn load_key_pair(&self) -> Result<KeyPair, Box<dyn Error>> {
        Ok(KeyPair::from_pem(&fs::read_to_string(&self.key)?)?)
    }

    fn engine(&self, params: Params) -> Result<RSA, Box<dyn Error>> {
        Ok(RSA::new(Params {
            threads: Some(self.threads),
            error_handler: Some(Arc::new(|e: &RsaError| log::error!("{}", e))),
            ..params
        })?)
    }

    fn progress_style(template: &str) -> Result<ProgressStyle, Box<dyn Error>> {
        Ok(ProgressStyle::default_bar().template(template)?.progress_chars("#>-"))
    }

    fn run(&self) -> Result<(), Box<dyn Error>> {
        match RunMode::from_str(&self.mode)? {
            RunMode::Generate => {
                let spinner = if self.silent { None } else {
                    let pb = ProgressBar::new_spinner();
                    pb.set_style(Self::progress_style("{spinner:.green} [{elapsed_precise}] {msg}")?);
                    pb.set_message(format!("generating {}-bit key pair", self.bits));
                    pb.enable_steady_tick(Duration::from_millis(100));
                    Some(pb)
                };
                let options = KeyGenOptions { rounds: self.rounds, ..Default::default() };
                let pair: KeyPair = KeyPair::generate_with(self.bits, &options, &mut OsRng)?;
                if let Some(pb) = spinner {
                    pb.finish_with_message("Done");
                }
                fs::write(&self.key, pair.to_pem()?)?;
                fs::write(self.public_key_path(), pair.public_key().serialize() + "\n")?;
                log::info!("Generated key files: {}, {}", self.key, self.public_key_path());
            }
            RunMode::Encode => {
                let rsa = self.engine(Params { enc_key: Some(self.load_public_key()?), ..Default::default() })?;
                let data = self.read_input()?;
                self.write_output(&rsa.encrypt(&data, &mut OsRng)?)?;
                log::info!("Encrypted {} bytes", data.len());
            }
            RunMode::Decode => {
                let (_, private_key) = self.load_key_pair()?.into_keys();
                let rsa = self.engine(Params { dec_key: Some(private_key), ..Default::default() })?;
                let data = self.read_input()?;
                self.write_output(&rsa.decrypt(&data)?)?;
                log::info!("Decrypted {} bytes", data.len());
            }
            RunMode::Sign => {
                let (_, private_key) = self.load_key_pair()?.into_keys();
                let rsa = self.engine(Params { private_key: Some(private_key), ..Default::default() })?;
                self.write_output(&rsa.create_sign(&self.read_input()?)?)?;
            }
            RunMode::Verify => {
                let rsa = self.engine(Params { public_key: Some(self.load_public_key()?), ..Default::default() })?;
                let signature = fs::read(&self.signature)?;
                if !rsa.validate_sign(&self.read_input()?, &signature)? {
                    return Err(format!("signature `{}` does not match", self.signature).into());
                }
                log::info!("Signature OK");
            }
            RunMode::Test => self.run_test()?,
        }
        Ok(())
    }

    /// Round-trips data through the stored pair: encryption, decryption and a
    /// signature check. Random data is used unless an input file is given.
    fn run_test(&self) -> Result<(), Box<dyn Error>> {
        let pair = self.load_key_pair()?;
        if let Ok(public_key) = self.load_public_key() {
            if &public_key != pair.public_key() {
                return Err(format!("{} does not belong to {}", self.public_key_path(), self.key).into());
            }
        }
        log::info!("key information: {} bits, public key {}", pair.bit_length(), pair.public_key());
        let (public_key, private_key) = pair.into_keys();
        let k = public_key.byte_length();
        let rsa = self.engine(Params {
            enc_key: Some(public_key.clone()),
            dec_key: Some(private_key.clone()),
            public_key: Some(public_key),
            private_key: Some(private_key),
            ..Default::default()
        })?;
        let source = if self.input != "stdin" { self.read_input()? } else {
            let mut data = vec![0u8; 1000];
            OsRng.fill_bytes(&mut data);
            data
        };
        let pb = if self.silent { None } else {
            let pb = ProgressBar::new(source.len() as u64);
            pb.set_style(Self::progress_style("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})")?);
            Some(pb)
        };
        let group_size = padding::chunk_size(k).max(1) * 8;
        let mut decrypted = Vec::with_capacity(source.len());
        for piece in source.chunks(group_size) {
            let c = rsa.encrypt(piece, &mut OsRng)?;
            decrypted.extend(rsa.decrypt(&c)?);
            if let Some(pb) = &pb {
                pb.inc(piece.len() as u64);
            }
        }
        if decrypted != source {
            return Err("decrypted data differs from the source".into());
        }
        match rsa.create_sign(&source) {
            Ok(signature) => {
                if !rsa.validate_sign(&source, &signature)? {
                    return Err("signature check failed".into());
                }
            }
            Err(e) => log::warn!("signature check skipped: {}", e),
        }
        if let Some(pb) = &pb {
            pb.finish_with_message("Test pass");
        }
        if self.output != "stdout" {
            self.write_output(&decrypted)?;
        }
        log::info!("Test pass");
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(if args.silent { LevelFilter::Off } else { LevelFilter::Info })
        .parse_default_env()
        .init();
    log::debug!("Run args: {:?}", args);
    args.run()
}
