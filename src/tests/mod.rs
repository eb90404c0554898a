mod inductive;
mod util;
