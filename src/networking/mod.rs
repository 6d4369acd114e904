/*!

# Networking Interfaces and Methods

## Introduction

Rollcall nodes speak JSON-RPC 2.0 to each other and to external drivers. A
connection carries exactly one request and one response: the caller connects,
writes one newline-terminated JSON object, reads one newline-terminated JSON
object back, and the server closes the connection.

A request looks like:

```json
{"jsonrpc":"2.0","id":"curl","method":"start_roll_call","params":[]}
```

and a response like:

```json
{"jsonrpc":"2.0","result":"ok","id":"curl"}
```

Ids are opaque JSON values; the node matches a response to its request by the
connection, not the id, but echoes the id back per JSON-RPC 2.0. Outbound
relays use fresh UUIDv4 string ids. Unknown fields in either direction are
ignored for forward compatibility.

## Methods

### start_roll_call

params: `[]`

Begin a new round with this node as origin. The node acks with `"ok"` as soon
as the outbound relay to its next peer has been submitted; it does not wait
for the ring to complete. If a round this node originated is still
outstanding, the call is rejected with error code `-32000` and message
`AlreadyInProgress`.

### relay

params: `[{"origin": "<id>", "hop_count": <n>, "visited": ["<id>", ...]}]`

Deliver the roll-call token to this node. If the token's origin matches this
node's identity the round is complete and the token is kept as the round
result. Otherwise the node appends itself to `visited`, increments
`hop_count`, forwards to its own next peer, and acks `"ok"` without waiting
for that forward to land.

## Error codes

| code   | meaning                                        |
|--------|------------------------------------------------|
| -32700 | parse error (request was not valid JSON)       |
| -32600 | invalid request (missing field, wrong version) |
| -32601 | method not found                               |
| -32602 | invalid params (e.g. inconsistent token)       |
| -32000 | protocol rejection (`AlreadyInProgress`)       |

Malformed input never kills the server: it answers with `-32700`/`-32600`
(id `null` when the request id is unrecoverable) and goes back to accepting
connections.

*/

pub mod transport;
pub mod wire;
