mod common;
mod notices;
mod satellites;
mod transitions;
