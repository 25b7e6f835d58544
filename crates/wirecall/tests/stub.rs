//! The hand-written stub pattern: a typed client facade that owns its
//! method handles and converts between native types and wire values.

use std::sync::Arc;
use std::thread;

use wirecall::codec::BufferPool;
use wirecall::{
    CallListener, Client, ClientError, Dispatcher, Endpoint, HandlerError, MethodHandle,
    MethodRegistry, Server, Value,
};

/// Typed facade over the remote calculator service. Handles are created
/// once at construction, so the identity digest is computed once per
/// method rather than once per call.
struct CalculatorStub {
    client: Client,
    add: MethodHandle,
    divide: MethodHandle,
}

impl CalculatorStub {
    fn connect(endpoint: Endpoint) -> Self {
        Self {
            client: Client::new(endpoint),
            add: MethodHandle::new("add", &["i64", "i64"]),
            divide: MethodHandle::new("divide", &["i64", "i64"]),
        }
    }

    fn add(&self, a: i64, b: i64) -> Result<i64, ClientError> {
        let result = self
            .client
            .invoke(&self.add, vec![Value::Int(a), Value::Int(b)])?;
        Ok(result.as_i64().unwrap_or_default())
    }

    fn divide(&self, a: i64, b: i64) -> Result<i64, ClientError> {
        let result = self
            .client
            .invoke(&self.divide, vec![Value::Int(a), Value::Int(b)])?;
        Ok(result.as_i64().unwrap_or_default())
    }
}

fn start_calculator() -> std::net::SocketAddr {
    let mut registry = MethodRegistry::new();
    registry.register(&MethodHandle::new("add", &["i64", "i64"]), |_, args| {
        let a = args[0].as_i64().ok_or("first arg must be an integer")?;
        let b = args[1].as_i64().ok_or("second arg must be an integer")?;
        Ok(Value::Int(a + b))
    });
    registry.register(&MethodHandle::new("divide", &["i64", "i64"]), |_, args| {
        let a = args[0].as_i64().ok_or("first arg must be an integer")?;
        let b = args[1].as_i64().ok_or("second arg must be an integer")?;
        if b == 0 {
            return Err(HandlerError::new("division by zero"));
        }
        Ok(Value::Int(a / b))
    });

    let dispatcher = Dispatcher::new(Arc::new(registry), Arc::new(BufferPool::new(8)));
    let server = Server::new(
        CallListener::bind_tcp("127.0.0.1:0").unwrap(),
        Arc::new(dispatcher),
    );
    let addr = server.local_addr().unwrap();
    thread::spawn(move || {
        let _ = server.run();
    });
    addr
}

#[test]
fn stub_methods_invoke_their_remote_counterparts() {
    let addr = start_calculator();
    let stub = CalculatorStub::connect(Endpoint::tcp(addr.to_string()));

    assert_eq!(stub.add(19, 23).unwrap(), 42);
    assert_eq!(stub.divide(84, 2).unwrap(), 42);
}

#[test]
fn stub_surfaces_remote_failures_as_errors() {
    let addr = start_calculator();
    let stub = CalculatorStub::connect(Endpoint::tcp(addr.to_string()));

    let err = stub.divide(1, 0).unwrap_err();
    assert!(matches!(err, ClientError::Remote(_)));
    assert!(err.to_string().contains("division by zero"));
}
