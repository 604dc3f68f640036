//! Script assets injected into the remote runtime.
//!
//! The event pump bootstrap runs in the chrome context with the port to
//! listen on as `arguments[0]`. It opens a loopback server socket, keeps
//! the accepted output streams, and stores the pump object under
//! [`EVENT_PUMP_GLOBAL`] so later sessions can find the existing listener
//! instead of binding a second one.
//!
//! # Pump Flow
//!
//! 1. The client probes [`EVENT_PUMP_GLOBAL`] for an existing pump
//! 2. If absent, it runs [`EVENT_PUMP_BOOTSTRAP`] with the chosen port
//! 3. The client connects to that port on the same host
//! 4. Browser-side code calls `globalThis.__marionetteEventPump.send(payload)`
//!    and the payload arrives as a `[2, payload]` frame

// ============================================================================
// Constants
// ============================================================================

/// Global under which the bootstrap stores the pump object.
pub const EVENT_PUMP_GLOBAL: &str = "globalThis.__marionetteEventPump";

/// Default bootstrap script for the secondary event channel.
///
/// Returns the port it listens on.
pub const EVENT_PUMP_BOOTSTRAP: &str = r#"
const port = arguments[0];
const Ci = Components.interfaces;
const server = Components.classes["@mozilla.org/network/server-socket;1"]
  .createInstance(Ci.nsIServerSocket);
server.init(port, true, -1);

const pump = {
  port,
  server,
  clients: [],
  send(payload) {
    const bytes = new TextEncoder().encode(JSON.stringify([2, payload]));
    let frame = bytes.length + ":";
    for (const b of bytes) {
      frame += String.fromCharCode(b);
    }
    this.clients = this.clients.filter((out) => {
      try {
        out.write(frame, frame.length);
        return true;
      } catch (e) {
        return false;
      }
    });
  },
};

server.asyncListen({
  onSocketAccepted(_server, transport) {
    pump.clients.push(transport.openOutputStream(Ci.nsITransport.OPEN_BLOCKING, 0, 0));
  },
  onStopListening() {
    pump.clients = [];
  },
});

globalThis.__marionetteEventPump = pump;
return port;
"#;

// ============================================================================
// Tests
// ============================================================================
