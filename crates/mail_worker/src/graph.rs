mod subgraph_client;

pub use subgraph_client::*;
