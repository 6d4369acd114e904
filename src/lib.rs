/*!
# Rollcall

Rollcall is a minimal peer-to-peer message-passing node. A set of rollcall
processes is arranged in a logical ring: each node knows the address of
exactly one "next peer". An external caller asks any node to start a roll
call; that node builds a token carrying its own identity and forwards it to
its next peer. Each peer records itself on the token and passes it onward
until the token arrives back at the node whose identity matches the token's
origin, at which point the round is complete.

The wire protocol is JSON-RPC 2.0 over newline-framed TCP. See the
[`networking`] module for the full protocol description.

# Usage

```bash
rollcall --config node_a
```

where `node_a.toml` holds the node's identity, bind address and next-peer
address. The process runs until it receives ctrl-c.
*/

pub mod error;
pub mod networking;
pub mod node;
pub mod runtime;
pub mod token;

pub use error::Error;

pub type Result<T> = std::result::Result<T, Error>;
