//! Model-specific arguments forwarded after `--` on the launcher command line.

use clap::Parser;

use crate::errors::Result;

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "model-args", no_binary_name = true, about = "process custom_args")]
pub struct ModelArgs {
    /// hparameter setting
    #[arg(long = "param", default_value = "big")]
    pub param_set: String,

    /// input vocab file for translation
    #[arg(long = "data_dir", default_value = "vocab.txt")]
    pub data_dir: String,

    /// input checkpoint for inference
    ///
    /// Accepted for compatibility only. The inference script's `--model_dir`
    /// is always `LaunchConfig::checkpoint`.
    #[arg(long = "model_dir", default_value = "")]
    pub model_dir: String,

    /// decode input file with path
    #[arg(long = "file", default_value = "")]
    pub decode_from_file: String,

    /// inference output file name
    #[arg(long = "file_out", default_value = "translate.txt")]
    pub decode_to_file: String,

    /// inference ref file with path
    #[arg(long = "reference", default_value = "")]
    pub reference: String,
}

impl Default for ModelArgs {
    fn default() -> Self {
        Self {
            param_set: "big".to_string(),
            data_dir: "vocab.txt".to_string(),
            model_dir: String::new(),
            decode_from_file: String::new(),
            decode_to_file: "translate.txt".to_string(),
            reference: String::new(),
        }
    }
}

impl ModelArgs {
    pub fn parse_custom<I, S>(custom_args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::try_parse_from(custom_args)?)
    }
}
