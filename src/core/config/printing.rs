use crate::core::config::data::Config;
use crate::core::settings::Temperature;

impl Config {
    pub fn print_all(&self) {
        println!("Current configuration:");
        match &self.host {
            Some(host) => println!("  host: {host}"),
            None => println!("  host: (unset)"),
        }
        match &self.default_model {
            Some(model) => println!("  default-model: {model}"),
            None => println!("  default-model: (unset)"),
        }
        match self.temperature() {
            Ok(Some(temperature)) => println!("  temperature: {temperature}"),
            Ok(None) => println!("  temperature: (unset, {:.1})", Temperature::DEFAULT),
            Err(err) => println!("  temperature: invalid ({err})"),
        }
    }
}
