//! Shopping Trip, suspending flavor
//!
//! The same shop-visit workflow as the `store_trip` demo, on the async
//! engine. Handler bodies are futures; the basket handler pretends the
//! item lookup is remote work.
//!
//! Run with: cargo run --example store_trip_async

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use trigfsm::{token_enum, AsyncStateMachine, StateEntered};
use uuid::Uuid;

token_enum! {
    enum StoreState {
        OutsideOfStore,
        EnterStore,
        ItemsInBasket,
        Checkout,
    }
}

#[derive(Clone)]
struct Item {
    id: Uuid,
    store: String,
}

impl Item {
    fn new(store: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            store: store.to_string(),
        }
    }
}

struct EnterStoreTrigger {
    store_name: String,
}

struct AddItemToBasket {
    item: Item,
}

struct GotoCheckout;

struct PayForItems;

struct LeaveStore;

#[derive(Default)]
struct Ledger {
    last_store: String,
    unpaid: Vec<Item>,
}

fn build_machine(ledger: &Arc<Mutex<Ledger>>) -> AsyncStateMachine<StoreState> {
    let machine = AsyncStateMachine::new(StoreState::OutsideOfStore);

    let guard_ledger = Arc::clone(ledger);
    machine
        .configure(StoreState::OutsideOfStore)
        .act_if(
            move || {
                let ledger = guard_ledger.lock().unwrap();
                ledger.unpaid.iter().any(|item| item.store == ledger.last_store)
            },
            |_: &StateEntered| {
                async {
                    println!("Outside of the store with unpaid items! Thief!");
                }
                .boxed()
            },
        )
        .transition_to::<EnterStoreTrigger>(StoreState::EnterStore);

    let enter_ledger = Arc::clone(ledger);
    machine
        .configure(StoreState::EnterStore)
        .act(move |trigger: &EnterStoreTrigger| {
            let store_name = trigger.store_name.clone();
            let ledger = Arc::clone(&enter_ledger);
            async move {
                ledger.lock().unwrap().last_store = store_name.clone();
                println!("Entering store {store_name}");
            }
            .boxed()
        })
        .transition_to::<AddItemToBasket>(StoreState::ItemsInBasket)
        .transition_to::<LeaveStore>(StoreState::OutsideOfStore);

    let basket_ledger = Arc::clone(ledger);
    machine
        .configure(StoreState::ItemsInBasket)
        .act(move |trigger: &AddItemToBasket| {
            let item = trigger.item.clone();
            let ledger = Arc::clone(&basket_ledger);
            async move {
                // Simulated remote price lookup.
                tokio::time::sleep(Duration::from_millis(10)).await;
                println!("Obtained item {}", item.id);
                ledger.lock().unwrap().unpaid.push(item);
            }
            .boxed()
        })
        .transition_to::<GotoCheckout>(StoreState::Checkout)
        .transition_to::<LeaveStore>(StoreState::OutsideOfStore);

    let checkout_ledger = Arc::clone(ledger);
    machine
        .configure(StoreState::Checkout)
        .on(move |_: &PayForItems| {
            let ledger = Arc::clone(&checkout_ledger);
            async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                let mut ledger = ledger.lock().unwrap();
                let store = ledger.last_store.clone();
                ledger.unpaid.retain(|item| item.store != store);
                println!("Paid for your items like a good person");
                StoreState::OutsideOfStore
            }
            .boxed()
        })
        .transition_to::<LeaveStore>(StoreState::OutsideOfStore);

    machine
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let ledger = Arc::new(Mutex::new(Ledger::default()));
    let machine = build_machine(&ledger);
    machine.start().await;

    let store_name = "Shopaporium";

    machine
        .dispatch(&EnterStoreTrigger {
            store_name: store_name.to_string(),
        })
        .await;
    machine
        .dispatch(&AddItemToBasket {
            item: Item::new(store_name),
        })
        .await;
    machine.dispatch(&LeaveStore).await;

    machine
        .dispatch(&EnterStoreTrigger {
            store_name: store_name.to_string(),
        })
        .await;
    machine
        .dispatch(&AddItemToBasket {
            item: Item::new(store_name),
        })
        .await;
    machine.dispatch(&GotoCheckout).await;
    machine.dispatch(&PayForItems).await;
    machine.dispatch(&LeaveStore).await;

    println!(
        "Trip over in state {:?}, {} unpaid item(s) left",
        machine.current().await,
        ledger.lock().unwrap().unpaid.len()
    );
}
