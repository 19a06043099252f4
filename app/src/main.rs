#![no_main]
#![no_std]

use defmt_rtt as _;
use panic_probe as _;

use hal::{
    self,
    adc::{Adc, AdcDevice, Align, InputType, SampleTime},
    clocks::Clocks,
    dma,
    dma::{Dma, DmaChannel, DmaInput, DmaInterrupt, DmaPeriph},
    pac,
    pac::{ADC1, DMA1, TIM2, TIM3},
    timer::{Timer, TimerInterrupt},
};

use charger_algo::{
    split, AnalogInputs, CalibrationTable, ChargeIntegrator, Config, Name, RawSamples,
    SampleConsumer, SampleProducer, SampleQueue, SharedStorage, PHYSICAL_INPUTS,
};

use core::sync::atomic::Ordering;

mod board;
mod pinout;

use board::{ChargerBoard, LATEST, MILLIS};

const CONFIG: Config = Config::new();

/// Queue depth between the acquisition tick and the main loop
const QUEUE_LEN: usize = 32;

/// ADC1 channels in the order of `Name::physical()`
const ADC1_SEQUENCE: [u8; PHYSICAL_INPUTS] = [1, 2, 3, 4, 5, 11, 12, 15, 6, 7, 8, 9, 10, 14];

static mut ADC_READ_BUF: [u16; PHYSICAL_INPUTS] = [0; PHYSICAL_INPUTS];

/// Charge counter, shared with the slow tick
static CHARGE: ChargeIntegrator = ChargeIntegrator::new();

/// RAM image of the calibration block
static CALIBRATION: SharedStorage<CalibrationTable> = SharedStorage::new(CalibrationTable::new());

type Analog = AnalogInputs<'static, &'static SharedStorage<CalibrationTable>>;

#[rtic::app(device = pac, peripherals = true)]
mod app {
    use super::*;

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        tim_fast: Timer<TIM2>,
        tim_slow: Timer<TIM3>,
        adc1: Adc<ADC1>,
        dma1: Dma<DMA1>,
        producer: SampleProducer<'static, QUEUE_LEN>,
        half_ms: bool,
        consumer: SampleConsumer<'static, QUEUE_LEN>,
        analog: Analog,
        board: ChargerBoard,
    }

    #[init(local = [queue: SampleQueue<QUEUE_LEN> = SampleQueue::new()])]
    fn init(ctx: init::Context) -> (Shared, Local) {
        let dp = ctx.device;
        let clock_cfg = Clocks::default();
        clock_cfg.setup().unwrap();
        defmt::debug!("SYSTEM: Clock frequency is {} MHz", clock_cfg.sysclk() / 1000000);

        let board = ChargerBoard::new();

        let mut analog = match AnalogInputs::new(CONFIG, &CALIBRATION, &CHARGE) {
            Ok(analog) => analog,
            Err(e) => defmt::panic!("SYSTEM: invalid measurement config: {}", e),
        };
        analog.initialize(&board);

        let (producer, consumer) = split(ctx.local.queue);

        let dma1 = Dma::new(dp.DMA1);
        dma::enable_mux1();
        dma::mux(DmaPeriph::Dma1, DmaChannel::C1, DmaInput::Adc1);

        let mut adc1 = Adc::new_adc1(dp.ADC1, AdcDevice::One, Default::default(), clock_cfg.systick());
        for (i, &channel) in ADC1_SEQUENCE.iter().enumerate() {
            adc1.set_sequence(channel, i as u8 + 1);
            adc1.set_input_type(channel, InputType::SingleEnded);
            adc1.set_sample_time(channel, SampleTime::T2);
        }
        adc1.set_sequence_len(PHYSICAL_INPUTS as u8);
        adc1.set_align(Align::Left);

        let fast_hz = 1_000_000. / CONFIG.tick_period_us as f32;
        let mut tim_fast = Timer::new_tim2(dp.TIM2, fast_hz, Default::default(), &clock_cfg);
        tim_fast.enable_interrupt(TimerInterrupt::Update);

        let slow_hz = fast_hz / CONFIG.slow_tick_interval as f32;
        let mut tim_slow = Timer::new_tim3(dp.TIM3, slow_hz, Default::default(), &clock_cfg);
        tim_slow.enable_interrupt(TimerInterrupt::Update);

        tim_fast.enable();
        tim_slow.enable();
        defmt::info!("SYSTEM: acquisition {} Hz, charge tick {} Hz", fast_hz, slow_hz);

        (
            Shared {},
            Local {
                tim_fast,
                tim_slow,
                adc1,
                dma1,
                producer,
                half_ms: false,
                consumer,
                analog,
                board,
            },
        )
    }

    #[idle(local = [analog, consumer, board])]
    fn idle(cx: idle::Context) -> ! {
        let analog = cx.local.analog;
        let board = cx.local.board;
        let mut last_count = 0;

        loop {
            analog.drain(cx.local.consumer, board);

            let count = analog.full_measurement_count();
            if count != last_count {
                last_count = count;
                if analog.is_reverse_polarity() {
                    if analog.is_power_on() {
                        analog.power_off(board);
                    }
                    defmt::warn!("ANALOG: reverse polarity, output kept off");
                } else if !analog.is_power_on() && analog.is_connected(Name::Vout) {
                    analog.power_on(board);
                    last_count = analog.full_measurement_count();
                }
            }

            cortex_m::asm::wfi();
        }
    }

    /// Acquisition tick: hands over the last ADC vector and starts the next conversion.
    #[task(binds = TIM2, priority = 3, local = [tim_fast, adc1, producer, half_ms])]
    fn acquisition_tick(cx: acquisition_tick::Context) {
        cx.local.tim_fast.clear_interrupt(TimerInterrupt::Update);

        *cx.local.half_ms = !*cx.local.half_ms;
        if !*cx.local.half_ms {
            MILLIS.fetch_add(1, Ordering::Relaxed);
        }

        let raw = RawSamples::new(unsafe { ADC_READ_BUF });
        critical_section::with(|cs| LATEST.borrow(cs).set(raw));
        if !cx.local.producer.push(raw) {
            defmt::trace!("ADC: queue full, {} dropped", cx.local.producer.dropped());
        }

        unsafe {
            cx.local.adc1.read_dma(
                &mut ADC_READ_BUF,
                &ADC1_SEQUENCE,
                DmaChannel::C1,
                Default::default(),
                DmaPeriph::Dma1,
            )
        };
    }

    /// Slow tick: integrates the output current.
    #[task(binds = TIM3, priority = 2, local = [tim_slow])]
    fn charge_tick(cx: charge_tick::Context) {
        cx.local.tim_slow.clear_interrupt(TimerInterrupt::Update);
        CHARGE.tick();
    }

    #[task(binds = DMA1_CH1, local = [dma1], priority = 3)]
    fn adc_end_read(cx: adc_end_read::Context) {
        dma::clear_interrupt(
            DmaPeriph::Dma1,
            DmaChannel::C1,
            DmaInterrupt::TransferComplete,
        );
        cx.local.dma1.stop(DmaChannel::C1);
    }
}

#[defmt::panic_handler]
fn panic() -> ! {
    cortex_m::asm::udf()
}
