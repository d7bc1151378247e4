/// REPL commands that start with a dot.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetaCommand {
    /// `.exit`: close the table and leave the loop.
    Exit,
    /// `.btree`: print every node of the tree.
    Btree,
    /// `.constants`: print the page layout constants.
    Constants,
    /// `.stats`: print tree and page cache counters.
    Stats,
}

impl MetaCommand {
    /// Parses a trimmed line beginning with `.`; `None` when unknown.
    pub fn parse(input: &str) -> Option<Self> {
        match input {
            ".exit" => Some(Self::Exit),
            ".btree" => Some(Self::Btree),
            ".constants" => Some(Self::Constants),
            ".stats" => Some(Self::Stats),
            _ => None,
        }
    }
}
